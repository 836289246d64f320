// ABOUTME: Integration tests for command-backed collaborators.
// ABOUTME: Shell scripts stand in for the real tools to exercise the stdin/stdout/exit protocol.

mod support;

use layerboot::config::SecretSource;
use layerboot::layers::{ErrorKind, LayerError};
use layerboot::secrets::{Redactor, SecretBroker};
use layerboot::tools::{
    ConnectivityStatus, EdgeRegistry, IdentityService, ImageBuilder, ImageSpec, Provisioner,
    ToolCommand, ToolEnv, WorkloadReconciler,
};
use layerboot::types::SizeClass;
use nonempty::NonEmpty;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn create_tool(dir: &TempDir, name: &str, script: &str) -> ToolCommand {
    let path = dir.path().join(name);
    fs::write(&path, script).unwrap();

    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();

    ToolCommand::new(
        name,
        NonEmpty::new(path.to_string_lossy().into_owned()),
        dir.path(),
    )
}

fn no_secrets() -> SecretBroker {
    SecretBroker::new(HashMap::new(), Redactor::new())
}

fn spec() -> ImageSpec {
    ImageSpec {
        name: "img-acme-trial".to_string(),
        size_class: SizeClass::Small,
    }
}

#[tokio::test]
async fn successful_call_decodes_the_json_response() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(
        &dir,
        "provisioner",
        "#!/bin/sh\ncat > /dev/null\necho '{\"present\": true, \"outputs\": {\"vnet\": \"vnet-acme\"}}'\n",
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let state = tool.describe(&env, "rg-acme-trial").await.unwrap().unwrap();
    assert_eq!(state.outputs.get("vnet").map(String::as_str), Some("vnet-acme"));
}

#[tokio::test]
async fn absent_scope_describes_as_none() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(&dir, "provisioner", "#!/bin/sh\necho '{\"present\": false}'\n");
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    assert!(tool.describe(&env, "rg-acme-trial").await.unwrap().is_none());
}

#[tokio::test]
async fn tempfail_exit_is_transient() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(
        &dir,
        "edge",
        "#!/bin/sh\necho 'contacting plane' >&2\necho 'plane busy, try later' >&2\nexit 75\n",
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.status(&env, "edge-acme-trial").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.kind(), ErrorKind::TransientExternal);
    assert_eq!(
        err.to_string(),
        "edge status temporarily failed: plane busy, try later"
    );
}

#[tokio::test]
async fn other_exit_codes_are_permanent() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(
        &dir,
        "images",
        "#!/bin/sh\necho 'quota exceeded' >&2\n\nexit 3\n",
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.build_or_fetch(&env, &spec()).await.unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(
        err.to_string(),
        "images build-or-fetch exited with status 3: quota exceeded"
    );
}

#[tokio::test]
async fn killed_tool_is_permanent() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(&dir, "reconciler", "#!/bin/sh\nkill -9 $$\n");
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.sync(&env, "gitops-acme-trial").await.unwrap_err();
    assert!(matches!(err, LayerError::Permanent(_)));
    assert!(err.to_string().contains("terminated by signal"));
}

#[tokio::test]
async fn garbage_output_is_a_permanent_error() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(&dir, "identity", "#!/bin/sh\necho 'logged in as acme'\n");
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.active_account(&env).await.unwrap_err();
    assert!(matches!(err, LayerError::Permanent(_)));
    assert!(err.to_string().contains("unreadable response"));
}

#[tokio::test]
async fn missing_executable_is_permanent() {
    let dir = TempDir::new().unwrap();
    let tool = ToolCommand::new(
        "provisioner",
        NonEmpty::new(dir.path().join("absent").to_string_lossy().into_owned()),
        dir.path(),
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.destroy(&env, "rg-acme-trial").await.unwrap_err();
    assert!(matches!(err, LayerError::Permanent(_)));
    assert!(err.to_string().contains("failed to start"));
}

#[tokio::test]
async fn tool_receives_operation_profile_and_request() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(
        &dir,
        "identity",
        "#!/bin/sh\n\
         cat > request.json\n\
         echo \"$1 $LAYERBOOT_OPERATION $LAYERBOOT_CUSTOMER $LAYERBOOT_ENVIRONMENT \
         $LAYERBOOT_REGION $LAYERBOOT_ACCOUNT $LAYERBOOT_SIZE_CLASS $LAYERBOOT_SCOPE\" > env.txt\n\
         echo '{\"accountId\": \"sub-acme-001\"}'\n",
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let account = tool.active_account(&env).await.unwrap();
    assert_eq!(account, support::ACCOUNT);

    let seen = fs::read_to_string(dir.path().join("env.txt")).unwrap();
    assert_eq!(
        seen.trim(),
        "active-account active-account acme trial westeurope sub-acme-001 small rg-acme-trial"
    );

    let request: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("request.json")).unwrap())
            .unwrap();
    assert_eq!(request["profile"]["name"], "acme");
    assert_eq!(request["profile"]["targetAccountId"], support::ACCOUNT);
}

#[tokio::test]
async fn configured_secrets_arrive_as_environment_variables() {
    let dir = TempDir::new().unwrap();
    let token_path: PathBuf = dir.path().join("token");
    fs::write(&token_path, "edge-token-91ab\n").unwrap();

    let tool = create_tool(
        &dir,
        "edge",
        "#!/bin/sh\nprintf '%s' \"$EDGE_TOKEN\" > seen-token\necho '{\"status\": \"connected\"}'\n",
    )
    .with_secrets(BTreeMap::from([(
        "EDGE_TOKEN".to_string(),
        "edge-token".to_string(),
    )]));

    let redactor = Redactor::new();
    let secrets = SecretBroker::new(
        HashMap::from([(
            "edge-token".to_string(),
            SecretSource::File { file: token_path },
        )]),
        redactor.clone(),
    );
    let profile = support::profile();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let status = tool.status(&env, "edge-acme-trial").await.unwrap();
    assert_eq!(status, ConnectivityStatus::Connected);
    assert_eq!(
        fs::read_to_string(dir.path().join("seen-token")).unwrap(),
        "edge-token-91ab"
    );
    assert_eq!(redactor.redact("token edge-token-91ab"), "token ***");
}

#[tokio::test]
async fn unresolvable_secret_fails_without_running_the_tool() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(&dir, "reconciler", "#!/bin/sh\ntouch ran\n").with_secrets(
        BTreeMap::from([("GIT_TOKEN".to_string(), "git-token".to_string())]),
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = tool.prune(&env, "gitops-acme-trial").await.unwrap_err();
    assert!(matches!(err, LayerError::Secret(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!dir.path().join("ran").exists());
}

#[tokio::test]
async fn image_lookup_without_reference_is_rejected() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(&dir, "images", "#!/bin/sh\necho '{\"present\": true}'\n");
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let err = ImageBuilder::lookup(&tool, &env, &spec()).await.unwrap_err();
    assert!(matches!(err, LayerError::Permanent(_)));
}

#[tokio::test]
async fn unit_listing_is_decoded() {
    let dir = TempDir::new().unwrap();
    let tool = create_tool(
        &dir,
        "reconciler",
        "#!/bin/sh\necho '{\"units\": [{\"name\": \"api\", \"ready\": true}, {\"name\": \"ingest\", \"ready\": false}]}'\n",
    );
    let profile = support::profile();
    let secrets = no_secrets();
    let env = ToolEnv {
        profile: &profile,
        secrets: &secrets,
    };

    let units = tool.list_units(&env, "gitops-acme-trial").await.unwrap();
    let ready: Vec<_> = units.iter().filter(|u| u.ready).map(|u| u.name.as_str()).collect();
    assert_eq!(ready, vec!["api"]);
    assert_eq!(units.len(), 2);
}
