// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sample applications that bindings get injected into.
//!
//! Deployment-based apps are considered running once their workload reports
//! `Available=True` and a route to them resolves. Knative apps are running once
//! their generated deployment reports `Available`.

use crate::cluster::{expect_output, full_match, Cluster};
use crate::command::{run_wait_for_status, Runner};
use crate::constants::conditions::AVAILABLE;
use crate::constants::poll::{
    APP_AVAILABLE_TIMEOUT_SECS, BINDING_TIMEOUT_SECS, DEFAULT_INTERVAL_SECS,
    DEPLOYMENT_TIMEOUT_SECS, HTTP_TIMEOUT_SECS, REDEPLOY_TIMEOUT_SECS, ROUTE_TIMEOUT_SECS,
    SECRET_TIMEOUT_SECS, STATUS_INTERVAL_SECS, STATUS_TIMEOUT_SECS,
};
use crate::error::{HarnessError, Result};
use crate::http::{HttpResponse, StatusCode};
use crate::poll::{Attempt, Clock};
use tracing::{debug, info, instrument};

pub const NODEJS_IMAGE: &str = "quay.io/pmacik/nodejs-rest-http-crud";
pub const GENERIC_TEST_APP_IMAGE: &str = "quay.io/redhat-developer/sbo-generic-test-app:20200923";
pub const QUARKUS_IMAGE: &str = "quay.io/pmacik/using-spring-data-jqa-quarkus:latest";

/// Endpoint of the sample apps reporting the name of the connected database
pub const DB_NAME_ENDPOINT: &str = "/api/status/dbNameCM";

const APP_PORT: u16 = 8080;
const API_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    /// Node.js CRUD app backed by a database
    NodeJs,
    /// Test app echoing its environment under `/env/{name}`
    Generic,
    /// Any image, deployed as-is
    Plain,
    /// Quarkus app imported as a Knative service
    Knative,
}

#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub port: u16,
    pub kind: AppKind,
    /// `deployment` or `deploymentconfig`
    pub resource: String,
    route: Option<String>,
}

impl Application {
    fn new(kind: AppKind, name: &str, namespace: &str, image: &str) -> Self {
        Application {
            name: name.to_string(),
            namespace: namespace.to_string(),
            image: image.to_string(),
            port: APP_PORT,
            kind,
            resource: "deployment".to_string(),
            route: None,
        }
    }

    pub fn nodejs(name: &str, namespace: &str, image: Option<&str>) -> Self {
        Self::new(AppKind::NodeJs, name, namespace, image.unwrap_or(NODEJS_IMAGE))
    }

    pub fn generic(name: &str, namespace: &str) -> Self {
        Self::new(AppKind::Generic, name, namespace, GENERIC_TEST_APP_IMAGE)
    }

    pub fn plain(name: &str, namespace: &str, image: &str) -> Self {
        Self::new(AppKind::Plain, name, namespace, image)
    }

    pub fn knative(name: &str, namespace: &str) -> Self {
        Self::new(AppKind::Knative, name, namespace, QUARKUS_IMAGE)
    }

    /// Deploy through a DeploymentConfig instead of a Deployment
    pub fn as_deployment_config(mut self) -> Self {
        self.resource = "deploymentconfig".to_string();
        self
    }

    /// Host (or URL, for Knative) recorded by the last successful readiness check
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    fn deployment_pattern(&self) -> String {
        match self.kind {
            AppKind::Knative => format!(r"{}-\w+-deployment", regex::escape(&self.name)),
            _ => regex::escape(&self.name),
        }
    }

    fn pod_pattern(&self) -> String {
        format!("{}.*", regex::escape(&self.name))
    }

    #[instrument(skip(self, cluster), fields(app = %self.name))]
    pub fn is_running<R: Runner, C: Clock>(
        &mut self,
        cluster: &Cluster<R, C>,
        wait: bool,
    ) -> Result<bool> {
        if self.kind == AppKind::Knative {
            return self.is_imported(cluster, wait);
        }

        let timeout = if wait { APP_AVAILABLE_TIMEOUT_SECS } else { 0 };
        let available = cluster
            .wait_for_condition(&self.resource, &self.name, &self.namespace, AVAILABLE, "True", timeout)
            .is_ok();
        if !available {
            return Ok(false);
        }

        let host = cluster
            .poller(format!("route to {}", self.name))
            .interval_secs(1)
            .timeout_secs(ROUTE_TIMEOUT_SECS)
            .until_ok(|| self.base_url(cluster), |host| !host.is_empty())?;
        info!(route = %host, "Application is running");
        self.route = Some(host);
        Ok(true)
    }

    fn is_imported<R: Runner, C: Clock>(&mut self, cluster: &Cluster<R, C>, wait: bool) -> Result<bool> {
        let pattern = self.deployment_pattern();
        let deployment = if wait {
            let found = cluster
                .poller(format!("deployment matching {}", pattern))
                .timeout_secs(DEPLOYMENT_TIMEOUT_SECS)
                .until_some(|| cluster.search_resource("deployment", &pattern, &self.namespace));
            match found {
                Ok(name) => Some(name),
                Err(HarnessError::Timeout { .. }) => None,
                Err(e) => return Err(e),
            }
        } else {
            cluster.search_resource("deployment", &pattern, &self.namespace)?
        };
        let Some(deployment) = deployment else {
            return Ok(false);
        };

        let command = cluster.command(format_args!(
            "get deployment {} -n {} -o \"jsonpath={{.status.conditions[?(@.type==\\\"{}\\\")].status}}\"",
            deployment, self.namespace, AVAILABLE
        ));
        let poller = cluster
            .poller(format!("deployment {} to be available", deployment))
            .interval_secs(STATUS_INTERVAL_SECS)
            .timeout_secs(STATUS_TIMEOUT_SECS);
        run_wait_for_status(cluster.runner(), &poller, &command, "True")?;

        self.route = Some(cluster.knative_route_url(&self.name, &self.namespace)?);
        info!(%deployment, "Knative application is imported");
        Ok(true)
    }

    /// Deploy the application, then wait for it to come up
    #[instrument(skip(self, cluster), fields(app = %self.name))]
    pub fn install<R: Runner, C: Clock>(
        &mut self,
        cluster: &Cluster<R, C>,
        binding_root: Option<&str>,
    ) -> Result<bool> {
        if self.kind == AppKind::Knative {
            let yaml = serde_yaml::to_string(&knative_service(&self.name, &self.namespace, &self.image))?;
            let output = cluster.apply(&yaml, None, None)?;
            let pattern = format!(
                r"service\.serving\.knative\.dev/{}\s(created|configured|unchanged)",
                regex::escape(&self.name)
            );
            expect_output(&format!("apply ksvc {}", self.name), &output, &pattern)?;
        } else {
            cluster.new_app(
                &self.name,
                &self.image,
                &self.namespace,
                binding_root,
                self.resource == "deploymentconfig",
            )?;
            cluster.expose(&self.name, &self.namespace, self.port)?;
        }
        self.is_running(cluster, true)
    }

    pub fn base_url<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        match self.kind {
            AppKind::Knative => cluster.knative_route_url(&self.name, &self.namespace),
            _ => cluster.route_host(&self.name, &self.namespace),
        }
    }

    /// Name of the workload backing the app
    fn deployment_name<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        if self.kind != AppKind::Knative {
            return Ok(self.name.clone());
        }
        cluster
            .search_resource(&self.resource, &self.deployment_pattern(), &self.namespace)?
            .ok_or_else(|| {
                HarnessError::NotFound(format!(
                    "{} matching {} in {}",
                    self.resource,
                    self.deployment_pattern(),
                    self.namespace
                ))
            })
    }

    /// `.metadata.generation` of the app's workload, waiting until it is reported
    pub fn generation<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<i64> {
        let deployment = self.deployment_name(cluster)?;
        cluster
            .poller(format!("generation of {}", deployment))
            .timeout_secs(BINDING_TIMEOUT_SECS)
            .until_some(|| {
                cluster
                    .jsonpath(&self.resource, &deployment, Some(&self.namespace), "{.metadata.generation}", None)
                    .map(|value| parse_generation(&value))
                    .transpose()
            })
    }

    pub fn observed_generation<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<Option<i64>> {
        let deployment = self.deployment_name(cluster)?;
        cluster
            .jsonpath(
                &self.resource,
                &deployment,
                Some(&self.namespace),
                "{.status.observedGeneration}",
                None,
            )
            .map(|value| parse_generation(&value))
            .transpose()
    }

    /// First Running pod of the app other than `exclude`
    fn running_pod<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        exclude: Option<&str>,
    ) -> Result<Option<String>> {
        let matcher = full_match(&self.pod_pattern())?;
        for pod in cluster.resource_names("pods", &self.namespace)? {
            if !matcher.is_match(&pod) || pod.ends_with("-build") || Some(pod.as_str()) == exclude {
                continue;
            }
            if cluster.pod_phase(&pod, &self.namespace).as_deref() == Some("Running") {
                return Ok(Some(pod));
            }
        }
        Ok(None)
    }

    pub fn running_pod_name<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<String> {
        cluster
            .poller(format!("running pod of {}", self.name))
            .timeout_secs(REDEPLOY_TIMEOUT_SECS)
            .until_some(|| self.running_pod(cluster, None))
    }

    /// A Running pod of the app that replaced `old_pod`
    pub fn redeployed_pod_name<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        old_pod: &str,
    ) -> Result<String> {
        cluster
            .poller(format!("pod of {} replacing {}", self.name, old_pod))
            .timeout_secs(REDEPLOY_TIMEOUT_SECS)
            .until_some(|| self.running_pod(cluster, Some(old_pod)))
    }

    /// Wait for the workload to move past `old_generation` and come up again.
    ///
    /// Returns the new Running pod, or the ready Knative revision.
    #[instrument(skip(self, cluster), fields(app = %self.name))]
    pub fn is_redeployed<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        old_generation: i64,
    ) -> Result<String> {
        cluster
            .poller(format!("{} to be redeployed past generation {}", self.name, old_generation))
            .timeout_secs(REDEPLOY_TIMEOUT_SECS)
            .until_some(|| {
                let generation = self.generation(cluster)?;
                if generation <= old_generation {
                    debug!(generation, old_generation, "Not redeployed yet");
                    return Ok(None);
                }
                match self.kind {
                    AppKind::Knative => self.ready_revision(cluster),
                    _ => self.running_pod(cluster, None),
                }
            })
    }

    fn ready_revision<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>) -> Result<Option<String>> {
        for revision in cluster.revisions(&self.namespace)? {
            if revision.starts_with(&self.name)
                && cluster.last_revision_status(&revision, &self.namespace)? == "True"
            {
                return Ok(Some(revision));
            }
        }
        Ok(None)
    }

    /// Workload whose `envFrom` references the intermediate `secret`
    pub fn deployment_with_intermediate_secret<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        secret: &str,
    ) -> Result<String> {
        let pattern = self.deployment_pattern();
        cluster
            .poller(format!("deployment {} to reference secret {}", pattern, secret))
            .timeout_secs(SECRET_TIMEOUT_SECS)
            .until_some(|| {
                for deployment in cluster.search_resources("deployment", &pattern, &self.namespace)? {
                    let env_from = cluster.deployment_env_from(&deployment, &self.namespace)?;
                    let references = env_from.iter().any(|source| {
                        source.secret_ref.as_ref().map(|r| r.name.as_str()) == Some(secret)
                    });
                    if references {
                        return Ok(Some(deployment));
                    }
                    debug!(%deployment, ?env_from, "Unexpected envFrom");
                }
                Ok(None)
            })
    }

    fn url<R: Runner, C: Clock>(&self, cluster: &Cluster<R, C>, endpoint: &str) -> Result<String> {
        let base = match &self.route {
            Some(route) => route.clone(),
            None => self.base_url(cluster)?,
        };
        if base.starts_with("http://") || base.starts_with("https://") {
            Ok(format!("{}{}", base, endpoint))
        } else {
            Ok(format!("http://{}{}", base, endpoint))
        }
    }

    fn poll_endpoint<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        url: &str,
        interval: u64,
        timeout: u64,
        accept: &[StatusCode],
    ) -> Result<HttpResponse> {
        cluster
            .poller(format!("GET {}", url))
            .interval_secs(interval)
            .timeout_secs(timeout)
            .until(|| request(url, accept))
    }

    /// A single request to `endpoint`, for callers running their own poll
    pub fn endpoint_attempt<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        endpoint: &str,
        accept: &[StatusCode],
    ) -> Attempt<HttpResponse> {
        match self.url(cluster, endpoint) {
            Ok(url) => request(&url, accept),
            Err(e) if e.is_retryable() => Attempt::Retry(e.to_string()),
            Err(e) => Attempt::Fatal(e),
        }
    }

    /// Body of `endpoint` once it answers 200
    pub fn response_from_api<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        endpoint: &str,
    ) -> Result<String> {
        let url = self.url(cluster, endpoint)?;
        let response = self.poll_endpoint(
            cluster,
            &url,
            API_INTERVAL_SECS,
            APP_AVAILABLE_TIMEOUT_SECS,
            &[StatusCode::OK],
        )?;
        Ok(response.body)
    }

    /// One read of an environment variable from the generic test app
    pub fn env_var_attempt<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        name: &str,
    ) -> Attempt<Option<serde_json::Value>> {
        self.endpoint_attempt(cluster, &format!("/env/{}", name), ENV_STATUSES)
            .and_then(|response| Attempt::from_result(env_value(&response), |_| true))
    }

    /// Value of an environment variable as reported by the generic test app,
    /// `None` when the app does not have it
    pub fn env_var_value<R: Runner, C: Clock>(
        &self,
        cluster: &Cluster<R, C>,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let url = self.url(cluster, &format!("/env/{}", name))?;
        let response = self.poll_endpoint(
            cluster,
            &url,
            DEFAULT_INTERVAL_SECS,
            HTTP_TIMEOUT_SECS,
            ENV_STATUSES,
        )?;
        env_value(&response)
    }
}

const ENV_STATUSES: &[StatusCode] = &[StatusCode::OK, StatusCode::NOT_FOUND];

fn request(url: &str, accept: &[StatusCode]) -> Attempt<HttpResponse> {
    match crate::http::get(url) {
        Ok(response) if accept.contains(&response.status) => Attempt::Ready(response),
        Ok(response) => Attempt::Retry(format!("status {}", response.status)),
        Err(e @ (HarnessError::Io(_) | HarnessError::Http(_))) => Attempt::Retry(e.to_string()),
        Err(e) => Attempt::Fatal(e),
    }
}

fn env_value(response: &HttpResponse) -> Result<Option<serde_json::Value>> {
    debug!(status = %response.status, body = %response.body, "env endpoint response");
    if response.status == StatusCode::OK {
        Ok(Some(response.json()?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::test_utils::{http_server, list_json, FakeClock, MockRunner};

    fn make_cluster(runner: MockRunner, clock: &FakeClock) -> Cluster<MockRunner, &FakeClock> {
        Cluster::new(runner, Cli::Oc).with_clock(clock)
    }

    #[test]
    fn test_is_running_records_route() {
        let clock = FakeClock::new();
        let runner = MockRunner::new()
            .on("oc wait --for=condition=Available=True deployment/app1 --timeout=0s -n ns1", "condition met", 0)
            .on_sequence("oc get route app1 -n ns1", vec![("", 0), ("app1-ns1.apps.example.com", 0)]);
        let cluster = make_cluster(runner, &clock);
        let mut app = Application::nodejs("app1", "ns1", None);

        assert!(app.is_running(&cluster, false).unwrap());
        assert_eq!(app.route(), Some("app1-ns1.apps.example.com"));
        assert_eq!(clock.elapsed().as_secs(), 1);
    }

    #[test]
    fn test_not_running_when_unavailable() {
        let clock = FakeClock::new();
        let runner = MockRunner::new().on("oc wait", "error: timed out waiting for the condition", 1);
        let cluster = make_cluster(runner.clone(), &clock);
        let mut app = Application::generic("app1", "ns1");

        assert!(!app.is_running(&cluster, true).unwrap());
        assert_eq!(
            runner.calls(),
            vec!["oc wait --for=condition=Available=True deployment/app1 --timeout=300s -n ns1"]
        );
    }

    #[test]
    fn test_install_creates_exposes_and_waits() {
        let clock = FakeClock::new();
        let runner = MockRunner::new()
            .on("oc new-app", "created", 0)
            .on("oc expose", "route exposed", 0)
            .on("oc wait", "condition met", 0)
            .on("oc get route", "app1.apps.example.com", 0);
        let cluster = make_cluster(runner.clone(), &clock);
        let mut app = Application::plain("app1", "ns1", "quay.io/org/app:1").as_deployment_config();

        assert!(app.install(&cluster, Some("/bindings")).unwrap());

        let calls = runner.calls();
        assert_eq!(
            calls[0],
            "oc new-app --docker-image=quay.io/org/app:1 --name=app1 -n ns1 -e SERVICE_BINDING_ROOT=/bindings --as-deployment-config=true"
        );
        assert_eq!(calls[1], "oc expose svc/app1 -n ns1 --name=app1");
        assert!(calls[2].contains("deploymentconfig/app1 --timeout=300s"));
    }

    #[test]
    fn test_knative_install_checks_apply_output() {
        let clock = FakeClock::new();
        let runner = MockRunner::new().on("oc apply", "service.serving.knative.dev/quarkus failed", 0);
        let cluster = make_cluster(runner.clone(), &clock);
        let mut app = Application::knative("quarkus", "ns1");

        assert!(matches!(
            app.install(&cluster, None),
            Err(HarnessError::UnexpectedOutput { .. })
        ));
        let yaml = runner.stdin_of("oc apply").unwrap();
        assert!(yaml.contains("serving.knative.dev/v1"));
        assert!(yaml.contains(QUARKUS_IMAGE));
    }

    #[test]
    fn test_knative_is_running_waits_for_available_deployment() {
        let clock = FakeClock::new();
        let deployments = list_json("Deployment", &["quarkus-00001-deployment"]);
        let runner = MockRunner::new()
            .on("oc get deployment -n ns1 -o json", &deployments, 0)
            .on_sequence("oc get deployment quarkus-00001-deployment", vec![("False", 0), ("True", 0)])
            .on("oc get rt quarkus", "http://quarkus-ns1.apps.example.com", 0);
        let cluster = make_cluster(runner, &clock);
        let mut app = Application::knative("quarkus", "ns1");

        assert!(app.is_running(&cluster, false).unwrap());
        assert_eq!(app.route(), Some("http://quarkus-ns1.apps.example.com"));
        assert_eq!(clock.elapsed().as_secs(), STATUS_INTERVAL_SECS);
    }

    #[test]
    fn test_running_pod_skips_build_pods() {
        let clock = FakeClock::new();
        let pods = list_json("Pod", &["app1-1-build", "app1-1-x7f2k", "other-1"]);
        let runner = MockRunner::new()
            .on("oc get pods -n ns1 -o json", &pods, 0)
            .on("oc get pod app1-1-build", "Running", 0)
            .on("oc get pod app1-1-x7f2k", "Running", 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(app.running_pod_name(&cluster).unwrap(), "app1-1-x7f2k");
    }

    #[test]
    fn test_redeployed_pod_differs_from_old_one() {
        let clock = FakeClock::new();
        let before = list_json("Pod", &["app1-1-aaaaa"]);
        let after = list_json("Pod", &["app1-1-aaaaa", "app1-2-bbbbb"]);
        let runner = MockRunner::new()
            .on_sequence(
                "oc get pods -n ns1 -o json",
                vec![(before.as_str(), 0), (after.as_str(), 0)],
            )
            .on("oc get pod", "Running", 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(
            app.redeployed_pod_name(&cluster, "app1-1-aaaaa").unwrap(),
            "app1-2-bbbbb"
        );
        assert_eq!(clock.elapsed().as_secs(), 5);
    }

    #[test]
    fn test_is_redeployed_waits_for_new_generation() {
        let clock = FakeClock::new();
        let runner = MockRunner::new()
            .on_sequence(
                "oc get deployment app1 -o \"jsonpath={.metadata.generation}\"",
                vec![("1", 0), ("2", 0)],
            )
            .on("oc get pods -n ns1 -o json", &list_json("Pod", &["app1-2-bbbbb"]), 0)
            .on("oc get pod app1-2-bbbbb", "Running", 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(app.is_redeployed(&cluster, 1).unwrap(), "app1-2-bbbbb");
    }

    #[test]
    fn test_generation_and_observed_generation() {
        let clock = FakeClock::new();
        let runner = MockRunner::new()
            .on("oc get deployment app1 -o \"jsonpath={.metadata.generation}\" -n ns1", "3", 0)
            .on("oc get deployment app1 -o \"jsonpath={.status.observedGeneration}\" -n ns1", "2", 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(app.generation(&cluster).unwrap(), 3);
        assert_eq!(app.observed_generation(&cluster).unwrap(), Some(2));
    }

    #[test]
    fn test_intermediate_secret_found_in_env_from() {
        let clock = FakeClock::new();
        let deployment = serde_json::json!({
            "metadata": { "name": "app1" },
            "spec": {
                "selector": {},
                "template": { "spec": { "containers": [ {
                    "name": "app1",
                    "envFrom": [ { "secretRef": { "name": "binding-request-abc" } } ]
                } ] } }
            }
        })
        .to_string();
        let runner = MockRunner::new()
            .on("oc get deployment -n ns1 -o json", &list_json("Deployment", &["app1", "app10"]), 0)
            .on("oc get deployment app1 -n ns1 -o json", &deployment, 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(
            app.deployment_with_intermediate_secret(&cluster, "binding-request-abc")
                .unwrap(),
            "app1"
        );
    }

    #[test]
    fn test_env_var_value_over_http() {
        let clock = FakeClock::new();
        let (host, _requests) = http_server(vec![
            ("503 Service Unavailable", ""),
            ("200 OK", r#""postgres""#),
            ("404 Not Found", ""),
        ]);
        let runner = MockRunner::new().on("oc get route app1", &host, 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::generic("app1", "ns1");

        assert_eq!(
            app.env_var_value(&cluster, "DB_USER").unwrap(),
            Some(serde_json::json!("postgres"))
        );
        assert_eq!(app.env_var_value(&cluster, "MISSING").unwrap(), None);
    }

    #[test]
    fn test_response_from_api() {
        let clock = FakeClock::new();
        let (host, requests) = http_server(vec![("200 OK", "db-demo")]);
        let runner = MockRunner::new().on("oc get route app1", &host, 0);
        let cluster = make_cluster(runner, &clock);
        let app = Application::nodejs("app1", "ns1", None);

        assert_eq!(app.response_from_api(&cluster, DB_NAME_ENDPOINT).unwrap(), "db-demo");
        assert!(requests
            .recv()
            .unwrap()
            .starts_with("GET /api/status/dbNameCM HTTP/1.1"));
    }
}
