use serde_json::json;
use tfstate_retrieve::backends::consul::ConsulBackend;
use tfstate_retrieve::backends::{Backend, BackendError, Workspace};
use tfstate_retrieve::terraform::BackendConfig;
use tfstate_retrieve::{BackendRegistry, run};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn consul_config(address: &str, extra: &str) -> BackendConfig {
    BackendConfig::parse(&format!(
        "terraform {{\n  backend \"consul\" {{\n    address = \"{address}\"\n    path = \"tf/network\"\n{extra}  }}\n}}\n"
    ))
    .unwrap()
}

fn server_address(mock_server: &MockServer) -> String {
    mock_server.address().to_string()
}

fn legacy_state() -> serde_json::Value {
    json!({
        "version": 3,
        "serial": 7,
        "modules": [{
            "path": ["root"],
            "outputs": {"vpc_id": {"type": "string", "value": "vpc-0a1b2c"}},
            "resources": {
                "aws_vpc.main": {
                    "type": "aws_vpc",
                    "primary": {
                        "id": "vpc-0a1b2c",
                        "attributes": {"cidr_block": "10.0.0.0/16"}
                    }
                }
            }
        }]
    })
}

#[tokio::test]
async fn test_refresh_reads_raw_key_with_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/tf/network"))
        .and(query_param("raw", ""))
        .and(header("X-Consul-Token", "s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(legacy_state()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = consul_config(
        &server_address(&mock_server),
        "    access_token = \"s3cr3t\"\n",
    );
    let mut backend = ConsulBackend::default();
    assert!(backend.validate(&config).is_empty());
    backend.configure(&config).unwrap();

    let mut workspace = backend.open_workspace("default").await.unwrap();
    workspace.refresh().await.unwrap();

    let root = &workspace.modules()[0];
    assert_eq!(root.outputs["vpc_id"].value, json!("vpc-0a1b2c"));
    assert_eq!(
        root.resources["aws_vpc.main"].attributes["cidr_block"],
        "10.0.0.0/16"
    );
}

#[tokio::test]
async fn test_named_workspace_reads_env_key_in_datacenter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/tf/network-env:staging"))
        .and(query_param("raw", ""))
        .and(query_param("dc", "eu 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(legacy_state()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = consul_config(&server_address(&mock_server), "    datacenter = \"eu 1\"\n");
    let mut backend = ConsulBackend::default();
    backend.configure(&config).unwrap();

    let mut workspace = backend.open_workspace("staging").await.unwrap();
    workspace.refresh().await.unwrap();
    assert_eq!(workspace.modules().len(), 1);
}

#[tokio::test]
async fn test_missing_key_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/tf/network"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = consul_config(&server_address(&mock_server), "");
    let mut backend = ConsulBackend::default();
    backend.configure(&config).unwrap();

    let mut workspace = backend.open_workspace("default").await.unwrap();
    workspace.refresh().await.unwrap();
    assert!(workspace.modules().is_empty());
}

#[tokio::test]
async fn test_server_error_fails_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/tf/network"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = consul_config(&server_address(&mock_server), "");
    let mut backend = ConsulBackend::default();
    backend.configure(&config).unwrap();

    let mut workspace = backend.open_workspace("default").await.unwrap();
    let result = workspace.refresh().await;
    assert!(matches!(result, Err(BackendError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_full_run_over_consul() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/tf/network"))
        .and(query_param("raw", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(legacy_state()))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("backend.tf"),
        format!(
            "terraform {{\n  backend \"consul\" {{\n    address = \"{}\"\n    path = \"tf/network\"\n  }}\n}}\n",
            server_address(&mock_server)
        ),
    )
    .unwrap();
    let args = dir.path().join("arguments.json");
    std::fs::write(
        &args,
        json!({
            "terraform_config_path": dir.path(),
            "require_all": true,
            "retrieves": [
                {"retrieve": "o/vpc_id"},
                {"retrieve": "r/aws_vpc.main/cidr_block"}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let data = run(&args, &BackendRegistry::default()).await.unwrap();
    assert_eq!(
        data,
        r#"{"aws_vpc":{"main":{"cidr_block":"10.0.0.0/16"}},"vpc_id":"vpc-0a1b2c"}"#
    );
}
