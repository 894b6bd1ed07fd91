// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for stack synthesis, ordering, and validation.

use hindsight_stack::resources::{
    FunctionKind, GrantAccess, PropertyValue, RemovalPolicy, ResourceId, SecretWriter, SubnetKind,
};
use hindsight_stack::graph::DependencyGraph;
use hindsight_stack::stack::{LLM_API_KEY_PARAMETER, VECTOR_EXTENSION, ids};
use hindsight_stack::{
    AppSettings, DeployParams, Stack, StackError, Tier, TierConfig, TierTable, synthesize_all,
};
use std::time::Duration;

fn id(s: &str) -> ResourceId {
    ResourceId::new(s)
}

fn params() -> DeployParams {
    DeployParams {
        llm_api_key: Some("sk-test-key".to_string()),
    }
}

fn dev_stack() -> Stack {
    Stack::synthesize(&TierConfig::dev(), &AppSettings::default(), &params()).unwrap()
}

/// Copy of the stack's graph without the `dependent -> dependency` edge.
fn graph_without(stack: &Stack, dependent: &str, dependency: &str) -> DependencyGraph {
    let order = stack.provisioning_order().unwrap();
    let mut graph = DependencyGraph::new();
    for resource in &order {
        graph.add_node(resource).unwrap();
    }
    for resource in &order {
        for dep in stack.dependencies.dependencies_of(resource) {
            if resource.as_str() == dependent && dep.as_str() == dependency {
                continue;
            }
            graph.add_dependency(resource, dep).unwrap();
        }
    }
    graph
}

fn position(order: &[ResourceId], name: &str) -> usize {
    order
        .iter()
        .position(|r| r.as_str() == name)
        .unwrap_or_else(|| panic!("{} not in order", name))
}

// ============================================================================
// Synthesis
// ============================================================================

#[test]
fn test_synthesize_all_builds_independent_stacks() {
    let stacks =
        synthesize_all(&TierTable::standard(), &AppSettings::default(), &params()).unwrap();

    let names: Vec<&str> = stacks.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["HindsightDevStack", "HindsightProdStack"]);
    assert_eq!(stacks[0].tier.tier, Tier::Dev);
    assert_eq!(stacks[1].tier.tier, Tier::Prod);
    assert!(stacks[1].description.contains("Production"));
}

#[test]
fn test_network_layout() {
    let stack = dev_stack();
    assert_eq!(stack.network.max_availability_zones, 2);
    assert_eq!(stack.network.nat_gateways, 1);
    assert!(stack.network.has_subnets(SubnetKind::Public));
    assert!(stack.network.has_subnets(SubnetKind::PrivateWithEgress));
}

#[test]
fn test_database_policy_follows_tier() {
    let settings = AppSettings::default();
    let dev = dev_stack();
    let prod = Stack::synthesize(&TierConfig::prod(), &settings, &params()).unwrap();

    assert_eq!(dev.database.instance_class, "db.t3.micro");
    assert_eq!(prod.database.instance_class, "db.t3.small");
    assert!(!dev.database.deletion_protection);
    assert!(prod.database.deletion_protection);
    assert_eq!(dev.database.backup_retention_days, 1);
    assert_eq!(prod.database.backup_retention_days, 7);
    assert_eq!(prod.database.removal_policy, RemovalPolicy::Snapshot);
    assert_eq!(dev.database.database_name, "hindsight");
    assert_eq!(dev.database.port, 5432);
}

#[test]
fn test_database_ingress() {
    let stack = dev_stack();
    assert!(stack.database.allows(&id(ids::EXTENSION_FUNCTION)));
    assert!(stack.database.allows(&id(ids::API_SERVICE)));
    assert!(!stack.database.allows(&id(ids::CONSOLE_SERVICE)));
}

#[test]
fn test_password_secret_is_alphanumeric() {
    let stack = dev_stack();
    let secret = stack.secret(&id(ids::RDS_SECRET)).unwrap();
    let policy = secret.password_policy.as_ref().unwrap();

    assert_eq!(secret.writer, SecretWriter::Generated);
    assert!(policy.exclude_punctuation);
    assert_eq!(policy.username, "hindsight_admin");
    assert_eq!(policy.generate_key, "password");
}

#[test]
fn test_each_secret_has_one_writer() {
    let stack = dev_stack();
    assert_eq!(stack.secrets.len(), 3);
    assert_eq!(
        stack.secret(&id(ids::DB_URL_SECRET)).unwrap().writer,
        SecretWriter::Step(id(ids::DB_URL_STEP))
    );
    assert_eq!(
        stack.secret(&id(ids::LLM_SECRET)).unwrap().writer,
        SecretWriter::Step(id(ids::LLM_KEY_STEP))
    );
}

#[test]
fn test_function_grants() {
    let stack = dev_stack();
    let url = stack.function(&id(ids::DB_URL_FUNCTION)).unwrap();
    assert!(url.can(&id(ids::RDS_SECRET), GrantAccess::Read));
    assert!(url.can(&id(ids::DB_URL_SECRET), GrantAccess::Write));
    assert!(!url.can(&id(ids::LLM_SECRET), GrantAccess::Write));

    let extension = stack.function(&id(ids::EXTENSION_FUNCTION)).unwrap();
    assert_eq!(extension.kind, FunctionKind::ExtensionEnabler);
    assert!(extension.in_private_network);
    assert_eq!(extension.timeout, Duration::from_secs(300));

    let reflect = stack.function(&id(ids::REFLECT_FUNCTION)).unwrap();
    assert!(!reflect.in_private_network);
    assert_eq!(
        reflect.environment.get("HINDSIGHT_BANK_ID"),
        Some(&PropertyValue::literal("johnny-robot"))
    );
}

#[test]
fn test_extension_step_properties() {
    let stack = dev_stack();
    let step = stack.step(&id(ids::EXTENSION_STEP)).unwrap();
    assert_eq!(
        step.properties.get("Extension"),
        Some(&PropertyValue::literal(VECTOR_EXTENSION))
    );
    assert_eq!(
        step.properties.get("RdsEndpoint"),
        Some(&PropertyValue::reference(&id(ids::RDS_INSTANCE), "endpoint"))
    );
}

#[test]
fn test_task_roles() {
    let stack = dev_stack();
    let execution = stack.role(&id(ids::TASK_EXECUTION_ROLE)).unwrap();
    for secret in [ids::RDS_SECRET, ids::LLM_SECRET, ids::DB_URL_SECRET] {
        assert!(execution.can(&id(secret), GrantAccess::Read), "{}", secret);
        assert!(!execution.can(&id(secret), GrantAccess::Write), "{}", secret);
    }
    assert!(stack.role(&id(ids::TASK_ROLE)).unwrap().grants.is_empty());

    let api = stack.task_definition(&id(ids::API_TASK)).unwrap();
    assert_eq!(api.execution_role, id(ids::TASK_EXECUTION_ROLE));
    assert_eq!(api.task_role, Some(id(ids::TASK_ROLE)));

    let console = stack.task_definition(&id(ids::CONSOLE_TASK)).unwrap();
    assert_eq!(console.execution_role, id(ids::TASK_EXECUTION_ROLE));
    assert_eq!(console.task_role, None);

    let order = stack.provisioning_order().unwrap();
    assert!(position(&order, ids::DB_URL_SECRET) < position(&order, ids::TASK_EXECUTION_ROLE));
    assert!(position(&order, ids::TASK_EXECUTION_ROLE) < position(&order, ids::API_TASK));
}

#[test]
fn test_api_task_environment_surface() {
    let stack = dev_stack();
    let task = stack.task_definition(&id(ids::API_TASK)).unwrap();

    assert_eq!(task.cpu, 512);
    assert_eq!(task.memory_mib, 1024);
    assert_eq!(task.ephemeral_storage_gib, Some(50));
    assert_eq!(task.container.port, 8888);
    assert_eq!(
        task.container.environment.get("HINDSIGHT_API_LLM_PROVIDER"),
        Some(&PropertyValue::literal("openai"))
    );
    assert_eq!(
        task.container.secrets.get("HINDSIGHT_API_DATABASE_URL"),
        Some(&id(ids::DB_URL_SECRET))
    );
    assert_eq!(
        task.container.secrets.get("HINDSIGHT_API_LLM_API_KEY"),
        Some(&id(ids::LLM_SECRET))
    );
}

#[test]
fn test_console_task_environment_surface() {
    let stack = dev_stack();
    let task = stack.task_definition(&id(ids::CONSOLE_TASK)).unwrap();

    assert_eq!(task.container.port, 9999);
    assert!(task.container.secrets.is_empty());
    assert_eq!(
        task.container.environment.get("HINDSIGHT_CP_DATAPLANE_API_URL"),
        Some(&PropertyValue::reference(&id(ids::API_SERVICE), "url"))
    );
    assert_eq!(
        task.container.environment.get("HOSTNAME"),
        Some(&PropertyValue::literal("0.0.0.0"))
    );
}

#[test]
fn test_service_health_checks() {
    let stack = dev_stack();
    let api = stack.service(&id(ids::API_SERVICE)).unwrap();
    assert_eq!(api.health_check.path, "/health");
    assert_eq!(api.health_check.timeout, Duration::from_secs(15));
    assert_eq!(api.idle_timeout_secs, Some(120));
    assert_eq!(api.desired_count, 1);

    let console = stack.service(&id(ids::CONSOLE_SERVICE)).unwrap();
    assert_eq!(console.health_check.path, "/api/health");
    assert_eq!(console.health_check_grace_period, Duration::from_secs(60));
}

#[test]
fn test_outputs() {
    let stack = dev_stack();
    let keys: Vec<&str> = stack.outputs.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "HindsightApiUrl",
            "RdsEndpoint",
            "RdsSecretArn",
            "LlmSecretArn",
            "DbUrlSecretArn",
            "ControlPlaneUrl"
        ]
    );
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_extension_enabled_before_url_populated() {
    let stack = dev_stack();
    let order = stack.provisioning_order().unwrap();

    assert!(position(&order, ids::EXTENSION_STEP) < position(&order, ids::DB_URL_STEP));
    assert!(position(&order, ids::RDS_INSTANCE) < position(&order, ids::EXTENSION_STEP));
}

#[test]
fn test_secrets_written_before_compute_starts() {
    let stack = dev_stack();
    let order = stack.provisioning_order().unwrap();
    let api = position(&order, ids::API_SERVICE);

    assert!(position(&order, ids::DB_URL_STEP) < api);
    assert!(position(&order, ids::LLM_KEY_STEP) < api);
    assert!(api < position(&order, ids::CONSOLE_SERVICE));
    assert!(api < position(&order, ids::REFLECT_FUNCTION));
    assert!(position(&order, ids::REFLECT_FUNCTION) < position(&order, ids::REFLECT_SCHEDULE));
}

#[test]
fn test_order_covers_every_resource() {
    let stack = dev_stack();
    let order = stack.provisioning_order().unwrap();
    assert_eq!(order.len(), stack.dependencies.len());
    assert_eq!(order.first().map(ResourceId::as_str), Some("DbUrlSecret"));
}

#[test]
fn test_validate_rejects_unordered_secret_reader() {
    let mut stack = dev_stack();
    // Rebuild the graph without the step edges the service relies on.
    let mut graph = hindsight_stack::graph::DependencyGraph::new();
    for resource in stack.provisioning_order().unwrap() {
        graph.add_node(&resource).unwrap();
    }
    stack.dependencies = graph;

    match stack.validate() {
        Err(StackError::Ordering(message)) => assert!(message.contains(ids::API_SERVICE)),
        other => panic!("expected ordering violation, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_url_step_before_extension() {
    let mut stack = dev_stack();
    stack.dependencies = graph_without(&stack, ids::DB_URL_STEP, ids::EXTENSION_STEP);
    assert!(!stack.dependencies.depends_on(&id(ids::DB_URL_STEP), &id(ids::EXTENSION_STEP)));

    match stack.validate() {
        Err(StackError::Ordering(message)) => {
            assert!(message.contains(ids::DB_URL_STEP));
            assert!(message.contains(ids::EXTENSION_STEP));
        }
        other => panic!("expected ordering violation, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_writer_without_write_access() {
    let mut stack = dev_stack();
    let function = stack
        .functions
        .iter_mut()
        .find(|f| f.id.as_str() == ids::DB_URL_FUNCTION)
        .unwrap();
    function
        .grants
        .retain(|grant| grant.secret.as_str() != ids::DB_URL_SECRET);

    match stack.validate() {
        Err(StackError::Ordering(message)) => {
            assert!(message.contains(ids::DB_URL_FUNCTION));
            assert!(message.contains(ids::DB_URL_SECRET));
        }
        other => panic!("expected ordering violation, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_unreadable_secret_binding() {
    let mut stack = dev_stack();
    let role = stack
        .roles
        .iter_mut()
        .find(|r| r.id.as_str() == ids::TASK_EXECUTION_ROLE)
        .unwrap();
    role.grants
        .retain(|grant| grant.secret.as_str() != ids::LLM_SECRET);

    match stack.validate() {
        Err(StackError::Ordering(message)) => {
            assert!(message.contains(ids::API_TASK));
            assert!(message.contains(ids::LLM_SECRET));
        }
        other => panic!("expected ordering violation, got {:?}", other),
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_missing_key_does_not_fail_synthesis() {
    let stack = Stack::synthesize(
        &TierConfig::dev(),
        &AppSettings::default(),
        &DeployParams::default(),
    )
    .unwrap();
    let step = stack.step(&id(ids::LLM_KEY_STEP)).unwrap();
    assert_eq!(
        step.properties.get("LlmApiKey"),
        Some(&PropertyValue::sensitive(LLM_API_KEY_PARAMETER, ""))
    );
    assert!(!stack.parameters[0].supplied);
}

#[test]
fn test_json_redacts_api_key() {
    let json = dev_stack().to_json().unwrap();
    assert!(!json.contains("sk-test-key"));

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let step = value["steps"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == ids::LLM_KEY_STEP)
        .unwrap();
    assert_eq!(step["properties"]["LlmApiKey"], "${param.LlmApiKey}");
    assert_eq!(value["parameters"][0]["name"], LLM_API_KEY_PARAMETER);
    assert_eq!(value["parameters"][0]["no_echo"], true);
    assert_eq!(value["parameters"][0]["supplied"], true);

    assert_eq!(value["name"], "HindsightDevStack");
    assert_eq!(value["schedule"]["expression"], "rate(1 hour)");
    assert_eq!(value["dependencies"]["DbUrlResource"][0], "DbUrlPopulator");
}
