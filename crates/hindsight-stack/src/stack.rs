// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stack synthesis.
//!
//! A [`Stack`] is the full desired state of one tier: network and database,
//! the three secrets and the steps that populate them, the compute tier, the
//! scheduled reflect job, and the edges that order all of it.
//!
//! ```text
//!  Vpc ──► RdsInstance ◄── PgvectorResource ◄── DbUrlResource ◄──┐
//!              ▲                                                  │
//!          RdsSecret                          LlmKeyResource ◄── HindsightApiService
//!                                                                 ▲          ▲
//!                                         ControlPlaneService ────┘          │
//!                                         ReflectSchedule ──► ReflectJob ────┘
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StackError};
use crate::graph::DependencyGraph;
use crate::output::{StackOutput, StackParameter};
use crate::resources::{
    BootstrapFunction, Cluster, ContainerSpec, DatabaseEngine, DatabaseInstance, FunctionKind,
    GrantAccess, HealthCheck, LogConfig, Network, PasswordPolicy, PropertyValue,
    ProvisioningStep, RemovalPolicy, ResourceId, Role, Secret, SecretWriter, Service,
    TaskDefinition,
};
use crate::schedule::ScheduleRule;
use crate::settings::AppSettings;
use crate::tier::{Tier, TierConfig, TierTable};

/// Logical identifiers of the resources every stack declares.
pub mod ids {
    /// Network.
    pub const VPC: &str = "Vpc";
    /// Generated database master password.
    pub const RDS_SECRET: &str = "RdsSecret";
    /// Operator-supplied LLM API key.
    pub const LLM_SECRET: &str = "LlmApiKeySecret";
    /// Derived database connection URL.
    pub const DB_URL_SECRET: &str = "DbUrlSecret";
    /// Database instance.
    pub const RDS_INSTANCE: &str = "RdsInstance";
    /// Container cluster.
    pub const CLUSTER: &str = "EcsCluster";
    /// Role that resolves task secret bindings.
    pub const TASK_EXECUTION_ROLE: &str = "TaskExecutionRole";
    /// Role the memory service process runs as.
    pub const TASK_ROLE: &str = "TaskRole";
    /// URL populator function.
    pub const DB_URL_FUNCTION: &str = "DbUrlPopulator";
    /// URL populator step.
    pub const DB_URL_STEP: &str = "DbUrlResource";
    /// API key populator function.
    pub const LLM_KEY_FUNCTION: &str = "LlmKeyPopulator";
    /// API key populator step.
    pub const LLM_KEY_STEP: &str = "LlmKeyResource";
    /// Extension enabler function.
    pub const EXTENSION_FUNCTION: &str = "PgvectorEnabler";
    /// Extension enabler step.
    pub const EXTENSION_STEP: &str = "PgvectorResource";
    /// Memory service task definition.
    pub const API_TASK: &str = "HindsightApiTask";
    /// Memory service.
    pub const API_SERVICE: &str = "HindsightApiService";
    /// Console task definition.
    pub const CONSOLE_TASK: &str = "ControlPlaneTask";
    /// Console service.
    pub const CONSOLE_SERVICE: &str = "ControlPlaneService";
    /// Reflect function.
    pub const REFLECT_FUNCTION: &str = "ReflectJob";
    /// Reflect timer rule.
    pub const REFLECT_SCHEDULE: &str = "ReflectSchedule";
}

/// Name of the vector extension the memory service needs.
pub const VECTOR_EXTENSION: &str = "vector";

/// Deploy-time parameter carrying the LLM API key.
pub const LLM_API_KEY_PARAMETER: &str = "LlmApiKey";

/// Deploy-time parameters supplied by the operator.
#[derive(Clone, Default)]
pub struct DeployParams {
    /// LLM API key; absent by default.
    pub llm_api_key: Option<String>,
}

impl std::fmt::Debug for DeployParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployParams")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Desired state of one tier.
#[derive(Debug, Clone, Serialize)]
pub struct Stack {
    /// Stack name (e.g. `HindsightDevStack`).
    pub name: String,
    /// Operator-facing description.
    pub description: String,
    /// Tier record the stack was synthesized from.
    pub tier: TierConfig,
    /// Deploy-time parameters.
    pub parameters: Vec<StackParameter>,
    /// Network.
    pub network: Network,
    /// Secrets.
    pub secrets: Vec<Secret>,
    /// Database instance.
    pub database: DatabaseInstance,
    /// Bootstrap functions.
    pub functions: Vec<BootstrapFunction>,
    /// One-shot provisioning steps.
    pub steps: Vec<ProvisioningStep>,
    /// Container cluster.
    pub cluster: Cluster,
    /// Roles assumed by tasks.
    pub roles: Vec<Role>,
    /// Task definitions.
    pub task_definitions: Vec<TaskDefinition>,
    /// Load-balanced services.
    pub services: Vec<Service>,
    /// Reflect timer.
    pub schedule: ScheduleRule,
    /// Operator outputs.
    pub outputs: Vec<StackOutput>,
    /// Dependency edges (dependent -> dependencies).
    pub dependencies: DependencyGraph,
}

/// Stack name for a tier.
pub fn stack_name(tier: Tier) -> String {
    match tier {
        Tier::Dev => "HindsightDevStack".to_string(),
        Tier::Prod => "HindsightProdStack".to_string(),
    }
}

/// Synthesize one stack per tier in `table`.
pub fn synthesize_all(
    table: &TierTable,
    settings: &AppSettings,
    params: &DeployParams,
) -> Result<Vec<Stack>> {
    table
        .iter()
        .map(|config| Stack::synthesize(config, settings, params))
        .collect()
}

impl Stack {
    /// Declare every resource of a tier and wire the ordering edges.
    pub fn synthesize(
        config: &TierConfig,
        settings: &AppSettings,
        params: &DeployParams,
    ) -> Result<Self> {
        let tier = config.tier;

        let llm_api_key = params.llm_api_key.clone().unwrap_or_default();
        if llm_api_key.is_empty() {
            // Compute may still start; the key step fails at provisioning time.
            warn!(
                tier = %tier,
                "No LLM API key supplied; the key populator will fail during deployment"
            );
        }

        let network = Network::standard(ids::VPC);

        let rds_secret = Secret::generated(
            ids::RDS_SECRET,
            format!("Hindsight RDS master password ({})", tier),
            PasswordPolicy::database_master(&settings.database_username),
        );
        let llm_secret = Secret::written_by(
            ids::LLM_SECRET,
            format!("Hindsight LLM API key ({}) - populated by bootstrap step", tier),
            ids::LLM_KEY_STEP,
        );
        let db_url_secret = Secret::written_by(
            ids::DB_URL_SECRET,
            format!("Hindsight database connection URL ({}) - populated by bootstrap step", tier),
            ids::DB_URL_STEP,
        );

        let mut database = DatabaseInstance {
            id: ResourceId::from(ids::RDS_INSTANCE),
            engine: DatabaseEngine::Postgres("18.1".to_string()),
            instance_class: config.database_instance_class.clone(),
            network: network.id.clone(),
            database_name: settings.database_name.clone(),
            username: settings.database_username.clone(),
            credentials: rds_secret.id.clone(),
            port: settings.database_port,
            removal_policy: RemovalPolicy::Snapshot,
            deletion_protection: config.deletion_protection,
            backup_retention_days: config.database_backup_retention_days,
            performance_insights: config.performance_insights,
            ingress: Vec::new(),
        };

        // Bootstrap functions

        let db_url_function =
            BootstrapFunction::new(ids::DB_URL_FUNCTION, FunctionKind::DbUrlPopulator)
                .grant(&rds_secret.id, GrantAccess::Read)
                .grant(&db_url_secret.id, GrantAccess::Write);
        let llm_key_function =
            BootstrapFunction::new(ids::LLM_KEY_FUNCTION, FunctionKind::LlmKeyPopulator)
                .grant(&llm_secret.id, GrantAccess::Write);
        let extension_function =
            BootstrapFunction::new(ids::EXTENSION_FUNCTION, FunctionKind::ExtensionEnabler)
                .in_private_network()
                .grant(&rds_secret.id, GrantAccess::Read);

        database.allow_from(
            extension_function.id.clone(),
            "Allow extension enabler to connect to PostgreSQL",
        );

        let endpoint = PropertyValue::reference(&database.id, "endpoint");

        let extension_step = ProvisioningStep::new(ids::EXTENSION_STEP, &extension_function.id)
            .property("RdsEndpoint", endpoint.clone())
            .property("RdsSecretArn", PropertyValue::reference(&rds_secret.id, "arn"))
            .property("DbName", PropertyValue::literal(&settings.database_name))
            .property("DbUsername", PropertyValue::literal(&settings.database_username))
            .property("DbPort", PropertyValue::literal(settings.database_port.to_string()))
            .property("Extension", PropertyValue::literal(VECTOR_EXTENSION));

        let db_url_step = ProvisioningStep::new(ids::DB_URL_STEP, &db_url_function.id)
            .property("RdsEndpoint", endpoint)
            .property("RdsSecretArn", PropertyValue::reference(&rds_secret.id, "arn"))
            .property("DbUrlSecretArn", PropertyValue::reference(&db_url_secret.id, "arn"))
            .property("DbName", PropertyValue::literal(&settings.database_name))
            .property("DbUsername", PropertyValue::literal(&settings.database_username))
            .property("DbPort", PropertyValue::literal(settings.database_port.to_string()));

        let llm_key_step = ProvisioningStep::new(ids::LLM_KEY_STEP, &llm_key_function.id)
            .property("LlmSecretArn", PropertyValue::reference(&llm_secret.id, "arn"))
            .property(
                "LlmApiKey",
                PropertyValue::sensitive(LLM_API_KEY_PARAMETER, llm_api_key.as_str()),
            );

        let parameters = vec![StackParameter {
            name: LLM_API_KEY_PARAMETER.to_string(),
            description: "API key for the LLM provider (starts with sk-)".to_string(),
            no_echo: true,
            supplied: !llm_api_key.is_empty(),
        }];

        // Compute tier

        let cluster = Cluster {
            id: ResourceId::from(ids::CLUSTER),
            network: network.id.clone(),
            container_insights: true,
        };

        // The platform resolves secret bindings with the execution role
        // before the container starts.
        let execution_role = Role::task_execution(ids::TASK_EXECUTION_ROLE)
            .grant(&rds_secret.id, GrantAccess::Read)
            .grant(&llm_secret.id, GrantAccess::Read)
            .grant(&db_url_secret.id, GrantAccess::Read);
        let task_role = Role::task(ids::TASK_ROLE);

        let api_task = TaskDefinition {
            id: ResourceId::from(ids::API_TASK),
            cpu: config.api_task_cpu,
            memory_mib: config.api_task_memory_mib,
            // the service image is too large for the default 20 GiB
            ephemeral_storage_gib: Some(50),
            execution_role: execution_role.id.clone(),
            task_role: Some(task_role.id.clone()),
            container: ContainerSpec {
                name: "HindsightApi".to_string(),
                image: settings.service_image.clone(),
                command: None,
                environment: BTreeMap::from([
                    (
                        "HINDSIGHT_API_LLM_PROVIDER".to_string(),
                        PropertyValue::literal(&settings.llm_provider),
                    ),
                    (
                        "HINDSIGHT_API_LLM_MODEL".to_string(),
                        PropertyValue::literal(&settings.llm_model),
                    ),
                    (
                        "HINDSIGHT_API_PORT".to_string(),
                        PropertyValue::literal(settings.api_port.to_string()),
                    ),
                ]),
                secrets: BTreeMap::from([
                    ("HINDSIGHT_API_DATABASE_URL".to_string(), db_url_secret.id.clone()),
                    ("HINDSIGHT_API_LLM_API_KEY".to_string(), llm_secret.id.clone()),
                ]),
                port: settings.api_port,
                logging: LogConfig {
                    stream_prefix: "hindsight-api".to_string(),
                    retention_days: config.log_retention_days,
                },
            },
        };

        let api_service = Service {
            id: ResourceId::from(ids::API_SERVICE),
            cluster: cluster.id.clone(),
            task_definition: api_task.id.clone(),
            desired_count: config.api_desired_count,
            public_load_balancer: true,
            listener_port: 80,
            health_check: HealthCheck::standard(
                &settings.api_health_check_path,
                Duration::from_secs(15),
            ),
            health_check_grace_period: Duration::from_secs(120),
            idle_timeout_secs: Some(settings.idle_timeout.as_secs()),
        };

        database.allow_from(
            api_service.id.clone(),
            "Allow memory service tasks to connect to PostgreSQL",
        );

        let api_url = PropertyValue::reference(&api_service.id, "url");

        let console_task = TaskDefinition {
            id: ResourceId::from(ids::CONSOLE_TASK),
            cpu: 256,
            memory_mib: 512,
            ephemeral_storage_gib: None,
            execution_role: execution_role.id.clone(),
            task_role: None,
            container: ContainerSpec {
                name: "ControlPlane".to_string(),
                image: settings.console_image.clone(),
                command: Some(vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "npx -y @vectorize-io/hindsight-control-plane --port $PORT --hostname $HOSTNAME"
                        .to_string(),
                ]),
                environment: BTreeMap::from([
                    ("HINDSIGHT_CP_DATAPLANE_API_URL".to_string(), api_url.clone()),
                    ("PORT".to_string(), PropertyValue::literal(settings.console_port.to_string())),
                    ("HOSTNAME".to_string(), PropertyValue::literal("0.0.0.0")),
                ]),
                secrets: BTreeMap::new(),
                port: settings.console_port,
                logging: LogConfig {
                    stream_prefix: "hindsight-cp".to_string(),
                    retention_days: config.log_retention_days,
                },
            },
        };

        let console_service = Service {
            id: ResourceId::from(ids::CONSOLE_SERVICE),
            cluster: cluster.id.clone(),
            task_definition: console_task.id.clone(),
            desired_count: 1,
            public_load_balancer: true,
            listener_port: 80,
            health_check: HealthCheck::standard(
                &settings.console_health_check_path,
                Duration::from_secs(5),
            ),
            health_check_grace_period: Duration::from_secs(60),
            idle_timeout_secs: None,
        };

        // Scheduled reflect job (public load balancer, no private network needed)

        let reflect_function =
            BootstrapFunction::new(ids::REFLECT_FUNCTION, FunctionKind::ReflectJob)
                .env("HINDSIGHT_API_URL", api_url)
                .env(
                    "HINDSIGHT_BANK_ID",
                    PropertyValue::literal(&settings.reflect_bank_id),
                );

        let schedule = ScheduleRule {
            id: ResourceId::from(ids::REFLECT_SCHEDULE),
            expression: config.reflect_schedule.clone(),
            target: reflect_function.id.clone(),
            description: format!("Scheduled Reflect job for Hindsight ({})", tier),
        };

        let outputs = vec![
            StackOutput::of(
                "HindsightApiUrl",
                &api_service.id,
                "url",
                "Hindsight API URL (HTTP - add HTTPS with a certificate for production)",
            ),
            StackOutput::of(
                "RdsEndpoint",
                &database.id,
                "endpoint",
                "RDS PostgreSQL endpoint",
            ),
            StackOutput::of(
                "RdsSecretArn",
                &rds_secret.id,
                "arn",
                "RDS master password secret ARN",
            ),
            StackOutput::of("LlmSecretArn", &llm_secret.id, "arn", "LLM API key secret ARN"),
            StackOutput::of(
                "DbUrlSecretArn",
                &db_url_secret.id,
                "arn",
                "Database URL secret ARN",
            ),
            StackOutput::of(
                "ControlPlaneUrl",
                &console_service.id,
                "url",
                "Hindsight Control Plane (Web UI) URL",
            ),
        ];

        let mut stack = Self {
            name: stack_name(tier),
            description: format!("Hindsight memory service - {} environment", tier.label()),
            tier: config.clone(),
            parameters,
            network,
            secrets: vec![rds_secret, llm_secret, db_url_secret],
            database,
            functions: vec![
                db_url_function,
                llm_key_function,
                extension_function,
                reflect_function,
            ],
            steps: vec![extension_step, db_url_step, llm_key_step],
            cluster,
            roles: vec![execution_role, task_role],
            task_definitions: vec![api_task, console_task],
            services: vec![api_service, console_service],
            schedule,
            outputs,
            dependencies: DependencyGraph::new(),
        };

        stack.dependencies = stack.wire_dependencies()?;
        stack.validate()?;

        info!(
            stack = %stack.name,
            tier = %tier,
            resources = stack.dependencies.len(),
            "Stack synthesized"
        );

        Ok(stack)
    }

    /// Build the dependency graph from the declared resources.
    fn wire_dependencies(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();

        let nodes = std::iter::once(&self.network.id)
            .chain(self.secrets.iter().map(|s| &s.id))
            .chain(std::iter::once(&self.database.id))
            .chain(self.functions.iter().map(|f| &f.id))
            .chain(self.steps.iter().map(|s| &s.id))
            .chain(std::iter::once(&self.cluster.id))
            .chain(self.roles.iter().map(|r| &r.id))
            .chain(self.task_definitions.iter().map(|t| &t.id))
            .chain(self.services.iter().map(|s| &s.id))
            .chain(std::iter::once(&self.schedule.id));
        for node in nodes {
            graph.add_node(node)?;
        }

        graph.add_dependency(&self.database.id, &self.database.network)?;
        graph.add_dependency(&self.database.id, &self.database.credentials)?;
        graph.add_dependency(&self.cluster.id, &self.cluster.network)?;

        for function in &self.functions {
            for grant in &function.grants {
                graph.add_dependency(&function.id, &grant.secret)?;
            }
            if function.in_private_network {
                graph.add_dependency(&function.id, &self.network.id)?;
            }
            for value in function.environment.values() {
                if let Some(resource) = value.referenced_resource() {
                    graph.add_dependency(&function.id, resource)?;
                }
            }
        }

        for step in &self.steps {
            graph.add_dependency(&step.id, &step.function)?;
            for resource in step.referenced_resources() {
                graph.add_dependency(&step.id, resource)?;
            }
        }

        // The extension must exist before the connection URL is handed out.
        graph.add_dependency(
            &ResourceId::new(ids::DB_URL_STEP),
            &ResourceId::new(ids::EXTENSION_STEP),
        )?;

        for role in &self.roles {
            for grant in &role.grants {
                graph.add_dependency(&role.id, &grant.secret)?;
            }
        }

        for task in &self.task_definitions {
            graph.add_dependency(&task.id, &task.execution_role)?;
            if let Some(task_role) = &task.task_role {
                graph.add_dependency(&task.id, task_role)?;
            }
            for secret in task.secret_readers() {
                graph.add_dependency(&task.id, secret)?;
            }
            for value in task.container.environment.values() {
                if let Some(resource) = value.referenced_resource() {
                    graph.add_dependency(&task.id, resource)?;
                }
            }
        }

        for service in &self.services {
            graph.add_dependency(&service.id, &service.cluster)?;
            graph.add_dependency(&service.id, &service.task_definition)?;

            // Secrets a task reads must be written before its service starts.
            let task = self.task_definition(&service.task_definition)?;
            for secret_id in task.secret_readers() {
                if let SecretWriter::Step(step) = &self.secret(secret_id)?.writer {
                    graph.add_dependency(&service.id, step)?;
                }
            }
        }

        graph.add_dependency(&self.schedule.id, &self.schedule.target)?;

        debug!(stack = %self.name, nodes = graph.len(), "Dependency graph wired");
        Ok(graph)
    }

    /// Check the ordering invariants of the stack.
    ///
    /// - the dependency graph is acyclic
    /// - every secret bound into a task is written before that task's service starts
    /// - every step that writes a secret holds write access on it
    /// - every secret bound into a task is readable by its execution role
    /// - the extension step precedes the connection URL step
    pub fn validate(&self) -> Result<()> {
        self.dependencies.topological_order()?;

        for service in &self.services {
            let task = self.task_definition(&service.task_definition)?;
            for secret_id in task.secret_readers() {
                let secret = self.secret(secret_id)?;
                if let SecretWriter::Step(step) = &secret.writer
                    && !self.dependencies.depends_on(&service.id, step)
                {
                    return Err(StackError::Ordering(format!(
                        "{} reads {} before {} writes it",
                        service.id, secret.id, step
                    )));
                }
            }
        }

        for secret in &self.secrets {
            if let SecretWriter::Step(step_id) = &secret.writer {
                let step = self.step(step_id)?;
                let function = self.function(&step.function)?;
                if !function.can(&secret.id, GrantAccess::Write) {
                    return Err(StackError::Ordering(format!(
                        "{} writes {} without write access",
                        function.id, secret.id
                    )));
                }
            }
        }

        for task in &self.task_definitions {
            let role = self.role(&task.execution_role)?;
            for secret_id in task.secret_readers() {
                if !role.can(secret_id, GrantAccess::Read) {
                    return Err(StackError::Ordering(format!(
                        "{} binds {} but {} cannot read it",
                        task.id, secret_id, role.id
                    )));
                }
            }
        }

        let url_step = ResourceId::new(ids::DB_URL_STEP);
        let extension_step = ResourceId::new(ids::EXTENSION_STEP);
        if !self.dependencies.depends_on(&url_step, &extension_step) {
            return Err(StackError::Ordering(format!(
                "{} must wait for {}",
                url_step, extension_step
            )));
        }

        Ok(())
    }

    /// Order in which the resources are provisioned.
    pub fn provisioning_order(&self) -> Result<Vec<ResourceId>> {
        self.dependencies.topological_order()
    }

    /// Look up a secret.
    pub fn secret(&self, id: &ResourceId) -> Result<&Secret> {
        self.secrets
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Look up a bootstrap function.
    pub fn function(&self, id: &ResourceId) -> Result<&BootstrapFunction> {
        self.functions
            .iter()
            .find(|f| &f.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Look up a provisioning step.
    pub fn step(&self, id: &ResourceId) -> Result<&ProvisioningStep> {
        self.steps
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Look up a role.
    pub fn role(&self, id: &ResourceId) -> Result<&Role> {
        self.roles
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Look up a task definition.
    pub fn task_definition(&self, id: &ResourceId) -> Result<&TaskDefinition> {
        self.task_definitions
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Look up a service.
    pub fn service(&self, id: &ResourceId) -> Result<&Service> {
        self.services
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| StackError::UnknownResource(id.to_string()))
    }

    /// Render the stack as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
