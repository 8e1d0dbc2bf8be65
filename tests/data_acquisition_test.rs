//! Data acquisition fallback chain against mock HTTP sources

use impactsense::{
    config::DataConfig,
    dataset::{clean_records, DataAcquirer, DataOrigin, SyntheticSpec},
};
use std::time::Duration;

const CSV: &str = "title,magnitude,cdi,mmi,alert,tsunami,sig,depth\n\
\"M 7.0 - 18 km SW of Malango, Solomon Islands\",7.0,8,7,green,1,768,14\n\
\"M 6.9 - 204 km SW of Bengkulu, Indonesia\",6.9,4,4,Green,0,735,25\n\
\"M 7.3 - Alaska Peninsula\",7.3,7,6,yellow,1,833,37\n\
\"M 7.3 - Alaska Peninsula\",7.3,7,6,yellow,1,833,37\n\
\"M 6.6 - 26 km SSE of Ashkāsham, Afghanistan\",6.6,9,8,orange,0,1000,223\n\
\"M 7.8 - Pedernales, Ecuador\",7.8,9,9,red,1,2045,20\n\
\"M 6.1 - broken row\",6.1,,5,green,0,600,10\n";

fn spec() -> SyntheticSpec {
    SyntheticSpec {
        n_samples: 120,
        seed: 42,
    }
}

#[tokio::test]
async fn test_first_healthy_source_wins() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/earthquake.csv")
        .with_status(200)
        .with_body(CSV)
        .create_async()
        .await;

    let url = format!("{}/earthquake.csv", server.url());
    let acquirer = DataAcquirer::new(vec![url.clone()], Duration::from_secs(5), spec());
    let data = acquirer.acquire().await.unwrap();

    mock.assert_async().await;
    assert_eq!(data.origin, DataOrigin::Remote { url });
    assert_eq!(data.records.len(), 6);
    assert_eq!(data.records[0].values, [7.0, 14.0, 8.0, 7.0, 768.0]);

    let (dataset, report) = clean_records(&data.records).unwrap();
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(dataset.n_samples(), 5);
    assert_eq!(dataset.labels, vec![0, 0, 3, 1, 2]);
}

#[tokio::test]
async fn test_server_error_falls_through_to_next_source() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/primary.csv")
        .with_status(500)
        .create_async()
        .await;
    let healthy = server
        .mock("GET", "/secondary.csv")
        .with_status(200)
        .with_body(CSV)
        .create_async()
        .await;

    let primary = format!("{}/primary.csv", server.url());
    let secondary = format!("{}/secondary.csv", server.url());
    let acquirer = DataAcquirer::new(
        vec![primary, secondary.clone()],
        Duration::from_secs(5),
        spec(),
    );
    let data = acquirer.acquire().await.unwrap();

    failing.assert_async().await;
    healthy.assert_async().await;
    assert_eq!(data.origin, DataOrigin::Remote { url: secondary });
}

#[tokio::test]
async fn test_missing_column_falls_back_to_synthetic() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/no_alert.csv")
        .with_status(200)
        .with_body("magnitude,depth,cdi,mmi,sig\n6.5,10,5,6,500\n")
        .create_async()
        .await;

    let acquirer = DataAcquirer::new(
        vec![format!("{}/no_alert.csv", server.url())],
        Duration::from_secs(5),
        spec(),
    );
    let data = acquirer.acquire().await.unwrap();

    assert_eq!(
        data.origin,
        DataOrigin::Synthetic {
            seed: 42,
            n_samples: 120
        }
    );
    assert_eq!(data.records.len(), 120);
}

#[tokio::test]
async fn test_synthetic_fallback_is_reproducible() {
    let acquirer = DataAcquirer::new(Vec::new(), Duration::from_secs(1), spec());

    let a = acquirer.acquire().await.unwrap();
    let b = acquirer.acquire().await.unwrap();
    assert_eq!(a.records, b.records);

    let (da, _) = clean_records(&a.records).unwrap();
    let (db, _) = clean_records(&b.records).unwrap();
    assert_eq!(da.class_distribution(), db.class_distribution());
}

#[tokio::test]
async fn test_from_config_uses_configured_seed() {
    let config = DataConfig {
        sources: Vec::new(),
        synthetic_samples: 30,
        seed: 9,
        ..DataConfig::default()
    };
    let data = DataAcquirer::from_config(&config).acquire().await.unwrap();
    assert_eq!(
        data.origin,
        DataOrigin::Synthetic {
            seed: 9,
            n_samples: 30
        }
    );
}
