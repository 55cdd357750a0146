// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Handlers for every step phrase used by the acceptance feature files.

use super::context::ScenarioContext;
use super::jq::JqQuery;
use super::registry::{StepArgs, Steps};
use crate::cluster::{expect_output, full_match, Cluster};
use crate::command::Runner;
use crate::constants::poll::{BINDING_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use crate::error::{HarnessError, Result};
use crate::http::StatusCode;
use crate::olm::{known, Installer, OperatorSpec};
use crate::poll::{Attempt, Clock};
use crate::wrappers::application::DB_NAME_ENDPOINT;
use crate::wrappers::{
    sbo, AppKind, Application, EtcdCluster, KnativeServing, Namespace, PostgresDb, Secret,
    ServiceBinding,
};
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

const DB_CONNECTION_TIMEOUT_SECS: u64 = 600;
const DB_CONNECTION_INTERVAL_SECS: u64 = 10;
const INJECTION_TIMEOUT_SECS: u64 = 400;
const ENV_VAR_TIMEOUT_SECS: u64 = 400;
const CONDITION_TIMEOUT_SECS: u64 = 600;
const SAMPLE_TIMEOUT_SECS: u64 = 300;

const OPERATOR_MANIFESTS_DIR: &str = "test/acceptance/resources";
const PETCLINIC_DIR: &str = "samples/apps/spring-petclinic";

/// Doc-string steps that apply a resource and expect it to be created or updated
const APPLY_PHRASES: &str = "The openshift route is present|Namespace is present|\
Backend service CSV is installed|The Custom Resource Definition is present|\
The Custom Resource is present|The ConfigMap is present|The Secret is present";

/// Operators with a dedicated step phrase
const OPERATOR_PHRASES: &str = "Cloud Native Postgres|MongoDB Community|Crunchy Data Postgres|\
Percona Mysql|Percona MongoDB|RabbitMQ|Opstree Redis";

pub fn register<R: Runner, C: Clock>(steps: &mut Steps<R, C>) -> Result<()> {
    // namespaces and the operator under test
    steps.register(r#"Namespace "([^"]*)" is used"#, namespace_is_used)?;
    steps.register(r"Namespace \[(\w+)\] is used", namespace_from_env_is_used)?;
    steps.register(
        r#"Service Binding Operator is running in "([^"]*)" namespace"#,
        sbo_is_running_in_namespace,
    )?;
    steps.register(
        r"Service Binding Operator is running in \[(\w+)\] namespace",
        sbo_is_running_in_namespace_from_env,
    )?;
    steps.register("Service Binding Operator is running", sbo_is_running)?;

    // backing services and their operators
    steps.register("PostgreSQL DB operator is installed", db_operator_is_installed)?;
    steps.register(
        r#"DB "([^"]*)" is running(?: in "([^"]*)" namespace)?"#,
        db_is_running,
    )?;
    steps.register("Openshift Serverless Operator is running", serverless_operator_is_running)?;
    steps.register("Knative serving is running", knative_serving_is_running)?;
    steps.register("Etcd operator running", etcd_operator_is_running)?;
    steps.register(r#"Etcd cluster "([^"]*)" is running"#, etcd_cluster_is_running)?;
    steps.register(&format!("({}) operator is running", OPERATOR_PHRASES), operator_is_running)?;
    steps.register(r#"OLM Operator "([^"]*)" is running"#, olm_operator_is_running)?;

    // applications
    steps.register(
        r#"Nodejs application "([^"]*)" imported from "([^"]*)" image is running"#,
        nodejs_app_is_running,
    )?;
    steps.register(
        r#"Imported Nodejs application "([^"]*)" is running"#,
        default_nodejs_app_is_running,
    )?;
    steps.register(
        r#"Imported Nodejs application "([^"]*)" is not running"#,
        nodejs_app_is_not_running,
    )?;
    steps.register(r#"Application endpoint "([^"]*)" is available"#, app_endpoint_is_available)?;
    steps.register(
        r#"Quarkus application "([^"]*)" is imported as Knative service"#,
        quarkus_app_is_imported,
    )?;
    steps.register(r#"Generic test application "([^"]*)" is running"#, generic_app_is_running)?;
    steps.register(r#""([^"]*)" is deployed from image "([^"]*)""#, app_is_deployed_from_image)?;
    steps.register("application should be re-deployed", app_is_redeployed)?;
    steps.register(
        r#"application should be connected to the DB "([^"]*)""#,
        app_is_connected_to_db,
    )?;
    steps.register(
        r#""([^"]*)" deployment must contain SBR name "([^"]*)""#,
        deployment_contains_secret_ref,
    )?;
    steps.register(
        r#"deployment must contain intermediate secret "([^"]*)""#,
        deployment_contains_intermediate_secret,
    )?;
    steps.register(
        r#"The application env var "([^"]*)" has value "(.*)""#,
        env_var_has_value,
    )?;
    steps.register(
        r#"The env var "([^"]*)" is not available to the application"#,
        env_var_is_not_available,
    )?;

    // service bindings
    steps.register("Service Binding is applied", binding_is_applied)?;
    steps.register(
        r#"Service Binding is applied from "([^"]*)" file"#,
        binding_is_applied_from_file,
    )?;
    steps.register(r"user (\S+) applies Service Binding", binding_is_applied_by_user)?;
    steps.register(
        "Invalid Service Binding is applied|Service Binding is unable to be applied",
        invalid_binding_is_applied,
    )?;
    steps.register(r#"Service [Bb]inding "([^"]*)" is deleted"#, binding_is_deleted)?;
    steps.register("Service Binding is deleted", binding_is_deleted)?;
    steps.register(r#"Service Binding "([^"]*)" is ready"#, binding_is_ready)?;
    steps.register("Service Binding is ready", binding_is_ready)?;
    steps.register(
        r#"Service Binding "([^"]*)" has the binding secret name set in the status"#,
        binding_secret_name_is_set,
    )?;
    steps.register(
        "Service Binding has the binding secret name set in the status",
        binding_secret_name_is_set,
    )?;
    steps.register(r#"Service Binding (\w+)\.(\w+) is "(.*)""#, binding_condition_field_is)?;
    steps.register(
        r#"Service Binding secret contains "([^"]*)" key"#,
        binding_secret_contains_key,
    )?;
    steps.register(
        r#"Service Binding "([^"]*)" is not persistent in the cluster"#,
        binding_is_not_persistent,
    )?;
    steps.register(r#"Service Binding "([^"]*)" is not updated"#, binding_is_not_updated)?;
    steps.register(
        r#"jsonpath "(.*)" of Service Binding "([^"]*)" should be changed to "(.*)""#,
        binding_jsonpath_matches,
    )?;
    steps.register(
        r#"jq "(.*)" of Service Binding "([^"]*)" should be changed to "(.*)""#,
        named_binding_jq_is,
    )?;
    steps.register(
        r#"jq "(.*)" of Service Binding should be changed to "(.*)""#,
        binding_jq_is,
    )?;
    steps.register("Error message is thrown", error_is_thrown)?;
    steps.register(r#"Error message "(.*)" is thrown"#, error_is_thrown)?;

    // secrets and arbitrary resources
    steps.register(
        r#"Secret "([^"]*)" contains "([^"]*)" key with value "(.*)""#,
        secret_contains_value,
    )?;
    steps.register(
        r#"Secret "([^"]*)" contains "([^"]*)" key with dynamic IP add?ress as the value"#,
        secret_contains_ip,
    )?;
    steps.register(r#"Secret "([^"]*)" does not contain "([^"]*)""#, secret_lacks_key)?;
    steps.register(r#"Secret "([^"]*)" is empty"#, secret_is_empty)?;
    steps.register(
        r#"Secret "([^"]*)" has been injected in to CR "([^"]*)" of kind "([^"]*)" at path "([^"]*)""#,
        secret_is_injected,
    )?;
    steps.register(APPLY_PHRASES, resource_is_applied)?;
    steps.register("BackingService is deleted", resource_is_deleted)?;
    steps.register(
        r#"jsonpath "(.*)" on "([^"]*)" should return "(.*)""#,
        resource_jsonpath_returns,
    )?;
    steps.register(
        r#"jsonpath "(.*)" on "([^"]*)" should return no value"#,
        resource_jsonpath_returns,
    )?;
    steps.register(
        r#"jsonpath "(.*)" on "([^"]*)" should contain "(.*)""#,
        resource_jsonpath_contains,
    )?;
    steps.register(
        r"Condition (\w+)=(\w+) for ([^/\s]+)/(\S+) resource is met(?: in less then (\d+) seconds)?",
        condition_is_met,
    )?;

    // getting started guide
    steps.register("PetClinic sample application is installed", petclinic_is_installed)?;
    steps.register("PetClinic sample application is running", petclinic_is_running)?;
    steps.register("PostgreSQL database is running", petclinic_postgresql_is_running)?;
    steps.register("PostgresCluster database is running", petclinic_pgcluster_is_running)?;

    Ok(())
}

fn assertion(message: impl Into<String>) -> HarnessError {
    HarnessError::Assertion(message.into())
}

fn use_namespace<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    name: &str,
) -> Result<()> {
    let namespace = Namespace::new(name);
    namespace.ensure(cluster)?;
    info!(namespace = name, "Namespace is used");
    context.namespace = Some(namespace);
    Ok(())
}

fn namespace_is_used<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    use_namespace(cluster, context, args.arg(0)?)
}

fn namespace_from_env_is_used<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let name = context.var(args.arg(0)?)?.to_string();
    use_namespace(cluster, context, &name)
}

fn expect_sbo_running<R: Runner, C: Clock>(cluster: &Cluster<R, C>) -> Result<()> {
    if !sbo::is_running(cluster)? {
        return Err(assertion("Service Binding Operator is not running"));
    }
    Ok(())
}

fn sbo_is_running_in_namespace<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    _context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    expect_sbo_running(cluster)
}

fn sbo_is_running_in_namespace_from_env<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    context.var(args.arg(0)?)?;
    expect_sbo_running(cluster)
}

fn sbo_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    if context.sbo_namespace.is_none() {
        context.namespace_name()?;
    }
    expect_sbo_running(cluster)
}

fn ensure_operator<R: Runner, C: Clock>(cluster: &Cluster<R, C>, spec: OperatorSpec) -> Result<()> {
    Installer::new(cluster, spec).ensure()
}

fn db_operator_is_installed<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    _context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    ensure_operator(cluster, known::db_operator(cluster.cli()))
}

fn db_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let namespace = match args.opt(1) {
        Some(namespace) => namespace,
        None => context.namespace_name()?,
    };
    let db = PostgresDb::new(args.arg(0)?, namespace);
    if !db.is_running(cluster, false)? {
        db.create(cluster)?;
        if !db.is_running(cluster, true)? {
            return Err(assertion(format!("Unable to launch DB '{}'", db.name)));
        }
    }
    info!(db = %db.name, "DB is running");
    Ok(())
}

fn serverless_operator_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    _context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    ensure_operator(cluster, known::serverless(cluster.cli()))
}

fn knative_serving_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    _context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    let serving = KnativeServing::default();
    Namespace::new(serving.namespace.as_str()).ensure(cluster)?;
    if serving.is_present(cluster) {
        return Ok(());
    }
    serving.create(cluster)?;
    if !serving.is_present(cluster) {
        return Err(assertion("Knative Serving is not present"));
    }
    Ok(())
}

fn etcd_operator_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    _context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    ensure_operator(cluster, known::etcd(cluster.cli()))
}

fn etcd_cluster_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let etcd = EtcdCluster::new(args.arg(0)?, context.namespace_name()?);
    if etcd.is_present(cluster) {
        return Ok(());
    }
    etcd.create(cluster)?;
    if !etcd.is_present(cluster) {
        return Err(assertion(format!("etcd cluster {} is not present", etcd.name)));
    }
    Ok(())
}

fn operator_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let cli = cluster.cli();
    let spec = match args.arg(0)? {
        "Cloud Native Postgres" => known::cloud_native_postgres(cli),
        "MongoDB Community" => known::community_mongodb(cli),
        "Crunchy Data Postgres" => known::crunchy_postgres(cli),
        "Percona Mysql" => known::percona_mysql(cli, context.namespace_name()?),
        "Percona MongoDB" => known::percona_mongodb(cli, context.namespace_name()?),
        "RabbitMQ" => known::rabbitmq(cli),
        "Opstree Redis" => known::redis(cli),
        other => return Err(HarnessError::Config(format!("unknown operator '{}'", other))),
    };
    ensure_operator(cluster, spec)
}

/// Apply the operator's manifest file; a known operator without one is
/// installed through OLM instead
fn olm_operator_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let name = args.arg(0)?;
    let namespace = context.namespace.as_ref().map(|ns| ns.name.as_str());
    let manifest = context
        .workdir
        .join(OPERATOR_MANIFESTS_DIR)
        .join(format!("{}.operator.manifest.yaml", name));
    if !manifest.is_file() {
        let scope = namespace.unwrap_or(cluster.cli().operators_namespace());
        if let Some(spec) = known::by_name(name, cluster.cli(), scope) {
            return ensure_operator(cluster, spec);
        }
    }

    cluster.apply_file(&manifest.to_string_lossy(), namespace, true)?;
    Ok(())
}

/// Leave `app` running, deploying it when needed
fn start_application<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    mut app: Application,
) -> Result<Application> {
    if !app.is_running(cluster, false)? {
        info!(app = %app.name, "Application is not running, importing it");
        if !app.install(cluster, None)? {
            return Err(assertion(format!(
                "Unable to start application '{}' from image '{}'",
                app.name, app.image
            )));
        }
    }
    Ok(app)
}

fn nodejs_app_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = Application::nodejs(args.arg(0)?, context.namespace_name()?, args.opt(1));
    context.application = Some(start_application(cluster, app)?);
    Ok(())
}

fn default_nodejs_app_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = Application::nodejs(args.arg(0)?, context.namespace_name()?, None);
    let app = start_application(cluster, app)?;
    app.response_from_api(cluster, DB_NAME_ENDPOINT)?;
    context.application = Some(app);
    Ok(())
}

fn nodejs_app_is_not_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let mut app = Application::nodejs(args.arg(0)?, context.namespace_name()?, None);
    if app.is_running(cluster, false)? {
        return Err(assertion("Application is running already"));
    }
    Ok(())
}

fn app_endpoint_is_available<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    context
        .application()?
        .response_from_api(cluster, args.arg(0)?)
        .map(|_| ())
}

fn quarkus_app_is_imported<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = Application::knative(args.arg(0)?, context.namespace_name()?);
    context.application = Some(start_application(cluster, app)?);
    Ok(())
}

fn generic_app_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = Application::generic(args.arg(0)?, context.namespace_name()?);
    context.application = Some(start_application(cluster, app)?);
    Ok(())
}

fn app_is_deployed_from_image<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = Application::plain(args.arg(0)?, context.namespace_name()?, args.arg(1)?);
    start_application(cluster, app).map(|_| ())
}

fn app_is_redeployed<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    let app = context.application()?;
    match app.kind {
        AppKind::NodeJs => {
            let original = context
                .application_original_pod_name
                .as_deref()
                .ok_or_else(|| assertion("application pod was never recorded"))?;
            let pod = app.redeployed_pod_name(cluster, original)?;
            info!(%pod, original, "Application re-deployed");
        }
        AppKind::Knative => {
            let generation = context
                .application_original_generation
                .ok_or_else(|| assertion("application is never deployed"))?;
            let revision = app.is_redeployed(cluster, generation)?;
            info!(%revision, "Application re-deployed");
        }
        other => {
            return Err(assertion(format!(
                "re-deployment is only tracked for Nodejs and Knative applications, not {:?}",
                other
            )))
        }
    }
    Ok(())
}

fn app_is_connected_to_db<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = context.application()?;
    let db = args.arg(0)?;
    cluster
        .poller(format!("{} to be connected to DB {}", app.name, db))
        .interval_secs(DB_CONNECTION_INTERVAL_SECS)
        .timeout_secs(DB_CONNECTION_TIMEOUT_SECS)
        .until(|| {
            app.endpoint_attempt(cluster, DB_NAME_ENDPOINT, &[StatusCode::OK])
                .and_then(|response| match response.body.trim() {
                    body if body == db => Attempt::Ready(()),
                    body => Attempt::Retry(format!("connected to {:?}", body)),
                })
        })
}

fn deployment_contains_secret_ref<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let deployment = args.arg(0)?;
    let secret = args.arg(1)?;
    let namespace = context.namespace_name()?;
    cluster
        .poller(format!("deployment {} to reference secret {}", deployment, secret))
        .timeout_secs(DEFAULT_TIMEOUT_SECS)
        .until_true(|| {
            let env_from = cluster.deployment_env_from(deployment, namespace)?;
            Ok(env_from
                .iter()
                .any(|source| source.secret_ref.as_ref().map(|r| r.name.as_str()) == Some(secret)))
        })
}

fn deployment_contains_intermediate_secret<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    context
        .application()?
        .deployment_with_intermediate_secret(cluster, args.arg(0)?)
        .map(|_| ())
}

fn env_var_has_value<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = context.application()?;
    let (name, expected) = (args.arg(0)?, args.arg(1)?);
    cluster
        .poller(format!("env var {} to be {:?}", name, expected))
        .timeout_secs(ENV_VAR_TIMEOUT_SECS)
        .until(|| {
            app.env_var_attempt(cluster, name).and_then(|value| {
                match value.as_ref().and_then(Value::as_str) {
                    Some(actual) if actual == expected => Attempt::Ready(()),
                    _ => Attempt::Retry(format!("got {:?}", value)),
                }
            })
        })
}

fn env_var_is_not_available<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let app = context.application()?;
    let name = args.arg(0)?;
    cluster
        .poller(format!("env var {} to disappear", name))
        .timeout_secs(ENV_VAR_TIMEOUT_SECS)
        .until(|| {
            app.env_var_attempt(cluster, name).and_then(|value| match value {
                None => Attempt::Ready(()),
                Some(value) => Attempt::Retry(format!("still set to {}", value)),
            })
        })
}

/// Record what re-deployment checks compare against, then create the binding
fn apply_binding<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    binding: ServiceBinding,
    user: Option<&str>,
) -> Result<()> {
    if let Some(app) = context.application.as_ref() {
        let (generation, pod) = match app.kind {
            AppKind::NodeJs => (
                app.observed_generation(cluster)?,
                Some(app.running_pod_name(cluster)?),
            ),
            AppKind::Knative => (Some(app.generation(cluster)?), None),
            AppKind::Generic | AppKind::Plain => (None, None),
        };
        context.application_original_generation = generation;
        context.application_original_pod_name = pod;
    }

    binding.create(cluster, user)?;
    context.add_binding(binding);
    context.sb_secret = None;
    Ok(())
}

fn binding_is_applied<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let namespace = context.namespace.as_ref().map(|ns| ns.name.as_str());
    let binding = ServiceBinding::from_yaml(args.text()?, namespace)?;
    apply_binding(cluster, context, binding, None)
}

fn binding_is_applied_from_file<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let path = context.workdir.join(args.arg(0)?);
    let namespace = context.namespace.as_ref().map(|ns| ns.name.as_str());
    let binding = ServiceBinding::from_file(&path, namespace)?;
    apply_binding(cluster, context, binding, None)
}

fn binding_is_applied_by_user<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let namespace = context.namespace.as_ref().map(|ns| ns.name.as_str());
    let binding = ServiceBinding::from_yaml(args.text()?, namespace)?;
    apply_binding(cluster, context, binding, Some(args.arg(0)?))
}

fn invalid_binding_is_applied<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let binding = ServiceBinding::from_yaml(args.text()?, Some(context.namespace_name()?))?;
    if context.binding(Some(binding.name())).is_ok() {
        context.resource_version = binding.resource_version(cluster);
    }
    context.expected_error = Some(binding.attempt_to_create_invalid(cluster)?);
    Ok(())
}

fn binding_is_deleted<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let binding = context.binding(args.opt(0))?.clone();
    context.sb_secret = Some(binding.secret_name(cluster)?);
    binding.delete(cluster).map(|_| ())
}

fn binding_is_ready<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let secret = context.binding(args.opt(0))?.wait_ready(cluster)?;
    context.sb_secret = Some(secret);
    Ok(())
}

fn binding_secret_name_is_set<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    context
        .binding(args.opt(0))?
        .wait_secret_name(cluster)
        .map(|_| ())
}

fn binding_condition_field_is<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    context
        .binding(None)?
        .wait_for_condition(cluster, args.arg(0)?, args.arg(1)?, args.arg(2)?)
}

fn binding_secret_contains_key<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let secret_name = context.binding(None)?.wait_secret_name(cluster)?;
    Secret::new(secret_name, context.namespace_name()?)
        .wait_for_key(cluster, args.arg(0)?)
        .map(|_| ())
}

fn binding_is_not_persistent<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let name = args.arg(0)?;
    let namespace = context.namespace_name()?;
    if cluster
        .search_resource("servicebindings", &regex::escape(name), namespace)?
        .is_some()
    {
        return Err(assertion(format!(
            "Service Binding {} is present in namespace '{}'",
            name, namespace
        )));
    }
    Ok(())
}

fn binding_is_not_updated<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let name = args.arg(0)?;
    let current = match context.binding(Some(name)) {
        Ok(binding) => binding.resource_version(cluster),
        Err(_) => cluster.jsonpath(
            "servicebindings",
            name,
            Some(context.namespace_name()?),
            "{.metadata.resourceVersion}",
            None,
        ),
    };
    if current != context.resource_version {
        return Err(assertion(format!(
            "Service Binding {} got updated: resource version {:?} became {:?}",
            name, context.resource_version, current
        )));
    }
    Ok(())
}

fn binding_jsonpath_matches<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let (path, name, expected) = (args.arg(0)?, args.arg(1)?, args.arg(2)?);
    let namespace = context.namespace_name()?;
    if cluster
        .search_resource("servicebindings", &regex::escape(name), namespace)?
        .is_none()
    {
        return Err(assertion(format!(
            "Service Binding '{}' does not exist in namespace '{}'",
            name, namespace
        )));
    }

    let result = cluster
        .jsonpath("sbr", name, Some(namespace), path, None)
        .ok_or_else(|| assertion(format!("No result for jsonpath {} of {}", path, name)))?;
    if !full_match(expected)?.is_match(&result) {
        return Err(assertion(format!(
            "Service Binding jsonpath result \"{}\" does not match \"{}\"",
            result, expected
        )));
    }
    Ok(())
}

fn wait_for_binding_query<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    binding: &ServiceBinding,
    expression: &str,
    expected: &str,
) -> Result<()> {
    let query: JqQuery = expression.parse()?;
    cluster
        .poller(format!("{} of {} to be {}", expression, binding.resource(), expected))
        .timeout_secs(BINDING_TIMEOUT_SECS)
        .until(|| {
            match cluster.object_json::<Value>(binding.crd_name(), binding.name(), binding.namespace()) {
                Ok(Some(object)) => match query.evaluate(&object) {
                    Some(value) if value == expected => Attempt::Ready(()),
                    value => Attempt::Retry(format!("value is {:?}", value)),
                },
                Ok(None) => Attempt::Retry(format!("{} not found", binding.resource())),
                Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
                Err(e) => Attempt::Fatal(e),
            }
        })
}

fn named_binding_jq_is<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let binding = context.binding(Some(args.arg(1)?))?;
    wait_for_binding_query(cluster, binding, args.arg(0)?, args.arg(2)?)
}

fn binding_jq_is<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let binding = context.binding(None)?;
    wait_for_binding_query(cluster, binding, args.arg(0)?, args.arg(1)?)
}

fn error_is_thrown<R: Runner, C: Clock>(
    _cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let error = context
        .expected_error
        .as_deref()
        .ok_or_else(|| assertion("An error message should happen"))?;
    let Some(expected) = args.opt(0) else {
        return Ok(());
    };

    let pattern = Regex::new(expected)
        .map_err(|e| HarnessError::Config(format!("invalid error pattern '{}': {}", expected, e)))?;
    if !pattern.is_match(error) {
        return Err(assertion(format!(
            "Actual error: '{}', Expected error: '{}'",
            error, expected
        )));
    }
    Ok(())
}

fn secret_in_namespace(context: &ScenarioContext, name: &str) -> Result<Secret> {
    Ok(Secret::new(name, context.namespace_name()?))
}

fn secret_contains_value<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    secret_in_namespace(context, args.arg(0)?)?.wait_for_value(
        cluster,
        args.arg(1)?,
        args.opt(2).unwrap_or_default(),
    )
}

fn secret_contains_ip<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let ip = secret_in_namespace(context, args.arg(0)?)?.wait_for_ip(cluster, args.arg(1)?)?;
    info!(%ip, "Secret holds an IP address");
    Ok(())
}

fn secret_lacks_key<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    secret_in_namespace(context, args.arg(0)?)?.wait_without_key(cluster, args.arg(1)?)
}

/// Only logs when data remains; bindings may be deleted before the secret is emptied
fn secret_is_empty<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    secret_in_namespace(context, args.arg(0)?)?
        .is_empty(cluster)
        .map(|_| ())
}

fn secret_is_injected<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let (secret, name, kind, path) = (args.arg(0)?, args.arg(1)?, args.arg(2)?, args.arg(3)?);
    let namespace = context.namespace_name()?;
    cluster
        .poller(format!("secret {} in {} {} at {}", secret, kind, name, path))
        .timeout_secs(INJECTION_TIMEOUT_SECS)
        .until_ok(
            || Ok(cluster.jsonpath(kind, name, Some(namespace), path, None)),
            |value| value.as_deref() == Some(secret),
        )
        .map(|_| ())
}

/// `metadata.name` of a doc-string manifest and the namespace it belongs in
fn manifest_target(context: &ScenarioContext, yaml: &str) -> Result<(String, Option<String>)> {
    let manifest: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let metadata = &manifest["metadata"];
    let name = metadata["name"]
        .as_str()
        .ok_or_else(|| HarnessError::Config("manifest has no metadata.name".to_string()))?;
    let namespace = metadata["namespace"]
        .as_str()
        .map(str::to_string)
        .or_else(|| context.namespace.as_ref().map(|ns| ns.name.clone()));
    Ok((name.to_string(), namespace))
}

fn resource_is_applied<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let yaml = args.text()?;
    let (name, namespace) = manifest_target(context, yaml)?;
    let output = cluster.apply(yaml, namespace.as_deref(), None)?;
    expect_output(
        &format!("apply {}", name),
        &output,
        &format!("{}.*(created|unchanged|configured)", regex::escape(&name)),
    )
}

fn resource_is_deleted<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let yaml = args.text()?;
    let (name, namespace) = manifest_target(context, yaml)?;
    let output = cluster.delete(yaml, namespace.as_deref())?;
    expect_output(
        &format!("delete {}", name),
        &output,
        &format!("{}.*deleted", regex::escape(&name)),
    )
}

/// `kind/name` as written in jsonpath steps
fn split_resource(resource: &str) -> Result<(&str, &str)> {
    resource.split_once('/').ok_or_else(|| {
        HarnessError::Config(format!("expected <kind>/<name>, got '{}'", resource))
    })
}

fn resource_jsonpath_returns<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let (path, resource) = (args.arg(0)?, args.arg(1)?);
    let expected = args.opt(2).unwrap_or_default();
    let (kind, name) = split_resource(resource)?;
    let namespace = context.namespace_name()?;
    cluster
        .poller(format!("jsonpath {} on {} to be {:?}", path, resource, expected))
        .timeout_secs(BINDING_TIMEOUT_SECS)
        .until_ok(
            || Ok(cluster.jsonpath(kind, name, Some(namespace), path, None)),
            |value| value.as_deref().unwrap_or_default() == expected,
        )
        .map(|_| ())
}

/// Membership the way the feature files mean it: list element, object key or substring
fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.contains(needle),
        Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        Value::String(text) => needle.as_str().is_some_and(|part| text.contains(part)),
        _ => false,
    }
}

fn resource_jsonpath_contains<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let (path, resource) = (args.arg(0)?, args.arg(1)?);
    let expected: Value = serde_json::from_str(args.arg(2)?)?;
    let (kind, name) = split_resource(resource)?;
    let namespace = context.namespace_name()?;

    let actual = cluster
        .poller(format!("jsonpath {} on {}", path, resource))
        .timeout_secs(BINDING_TIMEOUT_SECS)
        .until(|| match cluster.jsonpath(kind, name, Some(namespace), path, None) {
            Some(output) => match serde_json::from_str::<Value>(&output) {
                Ok(value) => Attempt::Ready(value),
                Err(e) => Attempt::Retry(e.to_string()),
            },
            None => Attempt::Retry(format!("no value for {}", path)),
        })?;

    if !json_contains(&actual, &expected) {
        return Err(assertion(format!("Expected {} in {}", expected, actual)));
    }
    Ok(())
}

fn condition_is_met<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    args: &StepArgs,
) -> Result<()> {
    let timeout: u64 = match args.opt(4) {
        Some(seconds) => seconds
            .parse()
            .map_err(|_| HarnessError::Config(format!("invalid timeout '{}'", seconds)))?,
        None => CONDITION_TIMEOUT_SECS,
    };
    cluster.wait_for_condition(
        args.arg(2)?,
        args.arg(3)?,
        context.namespace_name()?,
        args.arg(0)?,
        args.arg(1)?,
        timeout,
    )
}

fn apply_sample<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &ScenarioContext,
    file: &str,
) -> Result<()> {
    let path = context.workdir.join(PETCLINIC_DIR).join(file);
    let output = cluster.apply_file(&path.to_string_lossy(), Some(context.namespace_name()?), true)?;
    if output.trim().is_empty() {
        warn!(path = %path.display(), "Applying sample produced no output");
    }
    Ok(())
}

fn petclinic_is_installed<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    apply_sample(cluster, context, "petclinic-deployment.yaml")
}

fn petclinic_postgresql_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    apply_sample(cluster, context, "postgresql-deployment.yaml")?;
    cluster.wait_for_condition(
        "deployment",
        "spring-petclinic-postgresql",
        context.namespace_name()?,
        "Available",
        "True",
        SAMPLE_TIMEOUT_SECS,
    )
}

fn petclinic_pgcluster_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    apply_sample(cluster, context, "pgcluster-deployment.yaml")?;
    cluster.wait_for_condition(
        "PostgresCluster",
        "hippo",
        context.namespace_name()?,
        "PGBackRestReplicaCreate",
        "True",
        SAMPLE_TIMEOUT_SECS,
    )
}

fn petclinic_is_running<R: Runner, C: Clock>(
    cluster: &Cluster<R, C>,
    context: &mut ScenarioContext,
    _args: &StepArgs,
) -> Result<()> {
    cluster.wait_for_condition(
        "deployment",
        "spring-petclinic",
        context.namespace_name()?,
        "Available",
        "True",
        SAMPLE_TIMEOUT_SECS,
    )
}
