mod common;

use common::{connect, init_tracing, laptop_client, start_test_server, MAX_IMAGE_SIZE};
use pcbook::auth::AUTHORIZATION_HEADER;
use pcbook::proto::auth_service_client::AuthServiceClient;
use pcbook::proto::laptop_service_client::LaptopServiceClient;
use pcbook::proto::{
    CreateLaptopRequest, Cpu, Filter, Laptop, LoginRequest, RateLaptopRequest, SearchLaptopRequest,
};
use pcbook::sample;
use pcbook::Error;
use tonic::{Code, Request};

fn laptop_priced(price: f64) -> Laptop {
    Laptop {
        price_usd: price,
        cpu: Some(Cpu {
            number_cores: 8,
            min_ghz: 3.0,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn end_to_end_catalog_flow() {
    init_tracing();
    let server = start_test_server().await;

    let mut auth = AuthServiceClient::new(connect(&server.url).await);
    let token = auth
        .login(LoginRequest {
            username: "admin1".into(),
            password: "secret".into(),
        })
        .await
        .expect("Admin login should succeed")
        .into_inner()
        .access_token;
    assert!(!token.is_empty());

    let (refresher, client) = laptop_client(&server.url, "admin1", "secret").await;

    let id = client
        .create_laptop(laptop_priced(2000.0))
        .await
        .expect("Create should succeed");
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    let duplicate = Laptop {
        id: id.clone(),
        ..laptop_priced(2000.0)
    };
    let err = client.create_laptop(duplicate).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");

    let found = client
        .search_laptop(Filter {
            max_price_usd: 3000.0,
            ..Default::default()
        })
        .await
        .expect("Search should succeed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    let responses = client
        .rate_laptops(vec![(id.clone(), 8.0), (id.clone(), 6.0)])
        .await
        .expect("Rating should succeed");
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].laptop_id, id);
    assert_eq!((responses[0].rated_count, responses[0].average_score), (1, 8.0));
    assert_eq!((responses[1].rated_count, responses[1].average_score), (2, 7.0));

    refresher.shutdown().await;
}

#[tokio::test]
async fn search_above_price_bound_is_empty() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;

    client.create_laptop(laptop_priced(4500.0)).await.unwrap();

    let found = client
        .search_laptop(Filter {
            max_price_usd: 3000.0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    init_tracing();
    let server = start_test_server().await;
    let mut auth = AuthServiceClient::new(connect(&server.url).await);

    for (username, password) in [("admin1", "wrong"), ("nobody", "secret")] {
        let status = auth
            .login(LoginRequest {
                username: username.into(),
                password: password.into(),
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "incorrect username or password");
    }
}

#[tokio::test]
async fn user_role_may_rate_but_not_create() {
    init_tracing();
    let server = start_test_server().await;
    let (_admin_refresher, admin) = laptop_client(&server.url, "admin1", "secret").await;
    let (_user_refresher, user) = laptop_client(&server.url, "user1", "secret").await;

    let err = user.create_laptop(sample::new_laptop()).await.unwrap_err();
    match err {
        Error::PermissionDenied(message) => {
            assert!(message.contains("user"));
            assert!(message.contains("CreateLaptop"));
        }
        other => panic!("expected PermissionDenied, got {other:?}"),
    }

    let err = user
        .upload_image(&uuid::Uuid::new_v4().to_string(), ".jpg", vec![0; 10])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));

    let id = admin.create_laptop(sample::new_laptop()).await.unwrap();
    let responses = user.rate_laptops(vec![(id, 9.0)]).await.unwrap();
    assert_eq!(responses[0].average_score, 9.0);
}

#[tokio::test]
async fn protected_call_without_token_is_unauthenticated() {
    init_tracing();
    let server = start_test_server().await;
    let mut client = LaptopServiceClient::new(connect(&server.url).await);

    let status = client
        .create_laptop(CreateLaptopRequest {
            laptop: Some(sample::new_laptop()),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    let status = client
        .rate_laptop(tokio_stream::iter(vec![RateLaptopRequest {
            laptop_id: uuid::Uuid::new_v4().to_string(),
            score: 5.0,
        }]))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn forged_token_is_unauthenticated() {
    init_tracing();
    let server = start_test_server().await;
    let mut client = LaptopServiceClient::new(connect(&server.url).await);

    let mut request = Request::new(CreateLaptopRequest {
        laptop: Some(sample::new_laptop()),
    });
    request.metadata_mut().insert(
        AUTHORIZATION_HEADER,
        "Bearer eyJhbGciOiJIUzI1NiJ9.e30.c2lnbmF0dXJl".parse().unwrap(),
    );

    let status = client.create_laptop(request).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn public_search_needs_no_token() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, admin) = laptop_client(&server.url, "admin1", "secret").await;
    let id = admin.create_laptop(laptop_priced(1000.0)).await.unwrap();

    let mut anonymous = LaptopServiceClient::new(connect(&server.url).await);
    let mut stream = anonymous
        .search_laptop(SearchLaptopRequest {
            filter: Some(Filter {
                max_price_usd: 1500.0,
                ..Default::default()
            }),
        })
        .await
        .expect("Search is public")
        .into_inner();

    let first = stream.message().await.unwrap().unwrap();
    assert_eq!(first.laptop.unwrap().id, id);
    assert!(stream.message().await.unwrap().is_none());
}

#[tokio::test]
async fn upload_image_is_committed() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;
    let id = client.create_laptop(sample::new_laptop()).await.unwrap();

    let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let response = client.upload_image(&id, ".jpg", data.clone()).await.unwrap();

    assert_eq!(response.size, 3000);
    let stored = server.images.path().join(format!("{}.jpg", response.id));
    assert_eq!(std::fs::read(stored).unwrap(), data);
}

#[tokio::test]
async fn upload_image_from_file() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;
    let id = client.create_laptop(sample::new_laptop()).await.unwrap();

    let source = tempfile::tempdir().unwrap();
    let path = source.path().join("laptop.png");
    std::fs::write(&path, vec![42u8; 2500]).unwrap();

    let response = client.upload_image_file(&id, &path).await.unwrap();

    assert_eq!(response.size, 2500);
    assert!(server.images.path().join(format!("{}.png", response.id)).exists());
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_commit() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;
    let id = client.create_laptop(sample::new_laptop()).await.unwrap();

    let err = client
        .upload_image(&id, ".jpg", vec![0; MAX_IMAGE_SIZE + 1])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)), "got {err:?}");
    assert_eq!(std::fs::read_dir(server.images.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_for_unknown_laptop_is_not_found() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;

    let err = client
        .upload_image(&uuid::Uuid::new_v4().to_string(), ".jpg", vec![1; 100])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn rating_unknown_laptop_ends_stream() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;

    let err = client
        .rate_laptops(vec![(uuid::Uuid::new_v4().to_string(), 5.0)])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn malformed_laptop_id_is_invalid_argument() {
    init_tracing();
    let server = start_test_server().await;
    let (_refresher, client) = laptop_client(&server.url, "admin1", "secret").await;

    let err = client
        .create_laptop(Laptop {
            id: "not-a-uuid".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)), "got {err:?}");
}
