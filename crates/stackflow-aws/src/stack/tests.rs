use super::*;
use crate::resources::{autoscaling, elbv2};
use stackflow_cloud::intrinsic::collect_references;
use stackflow_cloud::{ActionType, Plan};
use stackflow_core::{ExternalLookups, NetworkContext, StackSettings};

const VPC_ID: &str = "vpc-0123456789abcdef0";

fn definition() -> StackDefinition {
    StackDefinition {
        settings: StackSettings {
            name: "UatApplicationStack".to_string(),
            account: "123456789012".to_string(),
            region: "ap-south-1".to_string(),
            ..Default::default()
        },
        network: NetworkContext {
            vpc_id: VPC_ID.to_string(),
            ecs_security_group: "sg-0123456789abcdef0".to_string(),
            alb_security_group: "sg-0fedcba9876543210".to_string(),
            private_subnets: vec![
                "subnet-0aaaaaaaaaaaaaaaa".to_string(),
                "subnet-0bbbbbbbbbbbbbbbb".to_string(),
            ],
            public_subnets: vec![
                "subnet-0cccccccccccccccc".to_string(),
                "subnet-0dddddddddddddddd".to_string(),
            ],
        },
        lookups: ExternalLookups {
            repository: "sample-api".to_string(),
            log_group: "/ecs/sample-api".to_string(),
            certificate_arn: "arn:aws:acm:ap-south-1:123456789012:certificate/abcd".to_string(),
            machine_image: "ami-0123456789abcdef0".to_string(),
        },
        variables: Default::default(),
    }
}

fn synth() -> Template {
    ApplicationStack::new(definition()).synth().unwrap()
}

fn properties<'a>(template: &'a Template, id: &str) -> &'a std::collections::BTreeMap<String, Value> {
    &template.resource(id).unwrap().properties
}

fn listener_on_port(template: &Template, port: u16) -> String {
    let listeners: Vec<&str> = template
        .resources_of_type(elbv2::LISTENER)
        .into_iter()
        .filter(|id| properties(template, id)["Port"] == port)
        .collect();
    assert_eq!(listeners.len(), 1, "exactly one listener on port {}", port);
    listeners[0].to_string()
}

fn rules_of(template: &Template, listener: &str) -> Vec<String> {
    template
        .resources_of_type(elbv2::LISTENER_RULE)
        .into_iter()
        .filter(|id| properties(template, id)["ListenerArn"] == json!({ "Ref": listener }))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_no_dangling_references() {
    let template = synth();

    for (id, resource) in &template.resources {
        for value in resource.properties.values() {
            for target in collect_references(value) {
                assert!(
                    template.resources.contains_key(&target)
                        || template.parameters.contains_key(&target),
                    "{} references undeclared {}",
                    id,
                    target
                );
            }
        }
        for dependency in &resource.depends_on {
            assert!(template.resources.contains_key(dependency));
        }
    }
}

#[test]
fn test_imports_are_inlined() {
    let template = synth();

    let tg = properties(&template, ids::TARGET_GROUP);
    assert_eq!(tg["VpcId"], VPC_ID);

    let https = properties(&template, ids::HTTPS_LISTENER);
    assert_eq!(
        https["Certificates"][0]["CertificateArn"],
        "arn:aws:acm:ap-south-1:123456789012:certificate/abcd"
    );

    let service = properties(&template, ids::SERVICE);
    assert_eq!(
        service["NetworkConfiguration"]["AwsvpcConfiguration"]["SecurityGroups"],
        json!(["sg-0123456789abcdef0"])
    );

    let lookups = &template.metadata["stackflow:lookups"];
    assert_eq!(lookups[ids::VPC]["Identifier"], VPC_ID);
    assert_eq!(lookups[ids::ECR_REPOSITORY]["Type"], "AWS::ECR::Repository");
    assert!(template.resource(ids::VPC).is_none());
}

#[test]
fn test_auto_scaling_group_capacity() {
    let template = synth();
    let groups = template.resources_of_type(autoscaling::AUTO_SCALING_GROUP);
    assert_eq!(groups, vec![ids::AUTO_SCALING_GROUP]);

    let asg = properties(&template, ids::AUTO_SCALING_GROUP);
    assert_eq!(asg["MinSize"], "1");
    assert_eq!(asg["MaxSize"], "1");
    assert_eq!(asg["DesiredCapacity"], "1");
    assert_eq!(
        asg["VPCZoneIdentifier"],
        json!(["subnet-0aaaaaaaaaaaaaaaa", "subnet-0bbbbbbbbbbbbbbbb"])
    );
}

#[test]
fn test_capacity_provider_is_attached_to_cluster() {
    let template = synth();
    let association = properties(&template, ids::CAPACITY_PROVIDER_ASSOCIATIONS);

    assert_eq!(association["Cluster"], json!({ "Ref": ids::CLUSTER }));
    assert_eq!(
        association["CapacityProviders"],
        json!([{ "Ref": ids::CAPACITY_PROVIDER }])
    );
    assert_eq!(
        association["DefaultCapacityProviderStrategy"][0]["Weight"],
        1
    );
}

#[test]
fn test_task_definition_container() {
    let template = synth();
    let task = properties(&template, ids::TASK_DEFINITION);

    let containers = task["ContainerDefinitions"].as_array().unwrap();
    assert_eq!(containers.len(), 1);

    let container = &containers[0];
    assert_eq!(container["MemoryReservation"], 512);
    assert_eq!(container["PortMappings"][0]["ContainerPort"], 8000);
    assert_eq!(container["LogConfiguration"]["LogDriver"], "awslogs");
    assert_eq!(
        container["LogConfiguration"]["Options"]["awslogs-group"],
        "/ecs/sample-api"
    );
    assert_eq!(
        container["Image"]["Fn::Join"][1][2],
        json!({ "Ref": IMAGE_TAG_PARAMETER })
    );
}

#[test]
fn test_image_tag_parameter_has_no_default() {
    let template = synth();
    let parameter = &template.parameters[IMAGE_TAG_PARAMETER];

    assert!(parameter.default.is_none());
    assert_eq!(parameter.allowed_pattern.as_deref(), Some(IMAGE_TAG_PATTERN));
}

#[test]
fn test_service_deployment_settings() {
    let template = synth();
    let service = template.resource(ids::SERVICE).unwrap();

    let breaker = &service.properties["DeploymentConfiguration"]["DeploymentCircuitBreaker"];
    assert_eq!(breaker["Enable"], true);
    assert_eq!(breaker["Rollback"], true);
    assert_eq!(service.properties["DesiredCount"], 1);
    assert_eq!(service.properties["PropagateTags"], "SERVICE");
    assert_eq!(
        service.properties["LoadBalancers"],
        json!([{
            "ContainerName": CONTAINER_NAME,
            "ContainerPort": 8000,
            "TargetGroupArn": { "Ref": ids::TARGET_GROUP },
        }])
    );
    assert_eq!(
        service.depends_on,
        vec![
            ids::HOST_ROUTING_RULE.to_string(),
            ids::CAPACITY_PROVIDER_ASSOCIATIONS.to_string(),
        ]
    );
}

#[test]
fn test_target_group_health_check() {
    let template = synth();
    let tg = properties(&template, ids::TARGET_GROUP);

    assert_eq!(tg["TargetType"], "ip");
    assert_eq!(tg["Port"], 8000);
    assert_eq!(tg["HealthCheckPath"], "/health");
    assert_eq!(tg["Matcher"]["HttpCode"], "200");
    assert_eq!(tg["HealthCheckIntervalSeconds"], 30);
}

#[test]
fn test_http_listener_only_redirects() {
    let template = synth();
    let http = listener_on_port(&template, HTTP_PORT);
    let listener = properties(&template, &http);

    let actions = listener["DefaultActions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["Type"], "redirect");
    assert_eq!(actions[0]["RedirectConfig"]["Protocol"], "HTTPS");
    assert_eq!(actions[0]["RedirectConfig"]["Port"], "443");

    assert!(rules_of(&template, &http).is_empty());
}

#[test]
fn test_https_listener_routes_by_host() {
    let template = synth();
    let https = listener_on_port(&template, HTTPS_PORT);
    let listener = properties(&template, &https);

    let default = &listener["DefaultActions"][0];
    assert_eq!(default["Type"], "fixed-response");
    assert_eq!(default["FixedResponseConfig"]["StatusCode"], "404");

    let rules = rules_of(&template, &https);
    assert_eq!(rules, vec![ids::HOST_ROUTING_RULE]);

    let rule = properties(&template, &rules[0]);
    assert_eq!(rule["Priority"], 10);
    assert_eq!(
        rule["Conditions"],
        json!([{ "Field": "host-header", "HostHeaderConfig": { "Values": ["api.example.com"] } }])
    );
    assert_eq!(
        rule["Actions"],
        json!([{ "Type": "forward", "TargetGroupArn": { "Ref": ids::TARGET_GROUP } }])
    );
}

#[test]
fn test_alb_ingress() {
    let template = synth();

    for (id, port) in [(ids::HTTP_INGRESS, 80), (ids::HTTPS_INGRESS, 443)] {
        let ingress = properties(&template, id);
        assert_eq!(ingress["GroupId"], "sg-0fedcba9876543210");
        assert_eq!(ingress["CidrIp"], "0.0.0.0/0");
        assert_eq!(ingress["FromPort"], port);
    }

    let from_alb = properties(&template, ids::ECS_INGRESS_FROM_ALB);
    assert_eq!(from_alb["GroupId"], "sg-0123456789abcdef0");
    assert_eq!(from_alb["SourceSecurityGroupId"], "sg-0fedcba9876543210");
    assert_eq!(from_alb["FromPort"], 8000);
}

#[test]
fn test_only_image_changes_between_tags() {
    let template = synth();
    let first = template
        .resolved(&ApplicationStack::parameter_values(&ImageTag::parse("41").unwrap()))
        .unwrap();
    let second = template
        .resolved(&ApplicationStack::parameter_values(&ImageTag::parse("42").unwrap()))
        .unwrap();

    let plan = Plan::between(Some(&first), &second);
    let updates = plan.actions_by_type(ActionType::Update);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id, ids::TASK_DEFINITION);
    assert_eq!(updates[0].changed_properties(), vec!["ContainerDefinitions"]);
    assert_eq!(plan.summary().create + plan.summary().delete, 0);

    let image = &second.resource(ids::TASK_DEFINITION).unwrap().properties["ContainerDefinitions"][0]["Image"];
    assert_eq!(image["Fn::Join"][1][2], "42");
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = synth().to_json_pretty().unwrap();
    let second = synth().to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_topological_order() {
    let graph = ApplicationStack::new(definition()).build().unwrap();
    let order = graph.topological_order().unwrap();
    assert_eq!(order.len(), graph.len());

    let position = |id: &str| order.iter().position(|o| o == id).unwrap();
    for resource in graph.resources() {
        for target in resource.references() {
            if graph.resource(&target).is_some() {
                assert!(
                    position(&target) < position(&resource.logical_id),
                    "{} must come before {}",
                    target,
                    resource.logical_id
                );
            }
        }
    }
    assert!(position(ids::HOST_ROUTING_RULE) < position(ids::SERVICE));
}

#[test]
fn test_tags_applied() {
    let template = synth();

    let cluster = properties(&template, ids::CLUSTER);
    assert!(cluster["Tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["Key"] == "Environment" && t["Value"] == "uat"));

    let asg = properties(&template, ids::AUTO_SCALING_GROUP);
    assert!(asg["Tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["Key"] == "Name" && t["Value"] == "UatApplicationStack/ApplicationAsg"));
}

#[test]
fn test_names_follow_environment() {
    let mut definition = definition();
    definition.settings.environment = "prod".to_string();
    let template = ApplicationStack::new(definition).synth().unwrap();

    assert_eq!(
        properties(&template, ids::CLUSTER)["ClusterName"],
        "prod-application-cluster"
    );
    assert_eq!(
        properties(&template, ids::LOAD_BALANCER)["Name"],
        "prod-application-alb"
    );
}

#[test]
fn test_subnets_from_vpc_context() {
    let mut definition = definition();
    definition.network.private_subnets.clear();
    definition.network.public_subnets.clear();

    let context = VpcContext {
        vpc_id: VPC_ID.to_string(),
        private_subnet_ids: vec!["subnet-0eeeeeeeeeeeeeeee".to_string()],
        public_subnet_ids: vec!["subnet-0ffffffffffffffff".to_string()],
        ..Default::default()
    };
    let template = ApplicationStack::new(definition)
        .with_vpc_context(context)
        .synth()
        .unwrap();

    assert_eq!(
        properties(&template, ids::AUTO_SCALING_GROUP)["VPCZoneIdentifier"],
        json!(["subnet-0eeeeeeeeeeeeeeee"])
    );
    assert_eq!(
        properties(&template, ids::LOAD_BALANCER)["Subnets"],
        json!(["subnet-0ffffffffffffffff"])
    );
}

#[test]
fn test_missing_subnets() {
    let mut definition = definition();
    definition.network.public_subnets.clear();

    let result = ApplicationStack::new(definition).build();
    assert!(matches!(result, Err(AwsError::MissingSubnets { .. })));
}

#[test]
fn test_vpc_context_mismatch() {
    let context = VpcContext {
        vpc_id: "vpc-0aaaaaaaaaaaaaaaa".to_string(),
        ..Default::default()
    };
    let result = ApplicationStack::new(definition())
        .with_vpc_context(context)
        .build();
    assert!(matches!(result, Err(AwsError::VpcContextMismatch { .. })));
}

#[test]
fn test_lookup_request() {
    let request = ApplicationStack::new(definition()).lookup_request();
    assert_eq!(
        request.cache_key(),
        "vpc-provider:account=123456789012:region=ap-south-1:vpc-id=vpc-0123456789abcdef0"
    );
}

#[test]
fn test_configured_vpc_context() {
    let stack = ApplicationStack::new(definition());
    let context = stack.configured_vpc_context().unwrap();
    assert_eq!(context.vpc_id, VPC_ID);
    assert_eq!(context.private_subnet_ids.len(), 2);
    assert_eq!(context.public_subnet_ids.len(), 2);
    assert!(context.is_usable());

    // 片方だけではスタック定義由来のコンテキストにならない
    let mut partial = definition();
    partial.network.public_subnets.clear();
    assert!(ApplicationStack::new(partial).configured_vpc_context().is_none());

    let rebuilt = ApplicationStack::new(definition()).with_vpc_context(context);
    assert!(rebuilt.build().is_ok());
}
