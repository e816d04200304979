//! The application stack
//!
//! One ECS service on a single EC2 container instance behind an
//! internet-facing ALB. Port 80 only redirects to HTTPS; port 443 answers
//! 404 unless the Host header matches [`DOMAIN_NAME`].

use crate::error::{AwsError, Result};
use crate::resources::{autoscaling, ec2, ecs, elbv2, iam};
use crate::tags::{stack_tags, tag_resource};
use serde_json::{Value, json};
use stackflow_cloud::intrinsic::{get_att, join, reference, sub};
use stackflow_cloud::{
    ExternalResource, Output, Parameter, ParameterValues, ResourceGraph, Template, VpcContext,
    VpcLookupRequest,
};
use stackflow_core::{IMAGE_TAG_PATTERN, ImageTag, StackDefinition};
use tracing::{debug, info, instrument};

pub const INSTANCE_TYPE: &str = "t3a.medium";
/// min = max = desired
pub const ASG_CAPACITY: u32 = 1;
pub const CONTAINER_PORT: u16 = 8000;
pub const MEMORY_RESERVATION_MIB: u32 = 512;
pub const HEALTH_CHECK_PATH: &str = "/health";
pub const HEALTH_CHECK_CODES: &str = "200";
pub const HEALTH_CHECK_INTERVAL_SECS: u32 = 30;
pub const DOMAIN_NAME: &str = "api.example.com";
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;
pub const HOST_RULE_PRIORITY: u32 = 10;
pub const TASK_FAMILY: &str = "sample-api";
pub const CONTAINER_NAME: &str = "sample-api";
pub const SERVICE_NAME: &str = "sample-api-service";
pub const DESIRED_COUNT: u32 = 1;
pub const LOG_STREAM_PREFIX: &str = "ecs";
pub const NOT_FOUND_STATUS: u16 = 404;
pub const NOT_FOUND_CONTENT_TYPE: &str = "text/plain";
pub const NOT_FOUND_BODY: &str = "Not Found";
pub const HEALTH_CHECK_GRACE_PERIOD_SECS: u32 = 60;

pub const IMAGE_TAG_PARAMETER: &str = "ImageTag";
const IMAGE_TAG_DESCRIPTION: &str = "Docker image tag to deploy (e.g. build number)";

/// Logical ids
pub mod ids {
    // imports
    pub const VPC: &str = "ExistingVpc";
    pub const ECS_SECURITY_GROUP: &str = "EcsSecurityGroup";
    pub const ALB_SECURITY_GROUP: &str = "AlbSecurityGroup";
    pub const ECR_REPOSITORY: &str = "ApplicationEcrRepo";
    pub const LOG_GROUP: &str = "ApplicationLogGroup";
    pub const CERTIFICATE: &str = "ApplicationCertificate";

    // resources
    pub const CLUSTER: &str = "ApplicationCluster";
    pub const INSTANCE_ROLE: &str = "ApplicationAsgInstanceRole";
    pub const INSTANCE_PROFILE: &str = "ApplicationAsgInstanceProfile";
    pub const LAUNCH_TEMPLATE: &str = "ApplicationAsgLaunchTemplate";
    pub const AUTO_SCALING_GROUP: &str = "ApplicationAsg";
    pub const CAPACITY_PROVIDER: &str = "ApplicationCapacityProvider";
    pub const CAPACITY_PROVIDER_ASSOCIATIONS: &str = "ApplicationClusterCapacityProviderAssociations";
    pub const EXECUTION_ROLE: &str = "ApplicationTaskDefinitionExecutionRole";
    pub const TASK_ROLE: &str = "ApplicationTaskDefinitionTaskRole";
    pub const TASK_DEFINITION: &str = "ApplicationTaskDefinition";
    pub const SERVICE: &str = "ApplicationService";
    pub const LOAD_BALANCER: &str = "ApplicationAlb";
    pub const TARGET_GROUP: &str = "ApplicationTargetGroup";
    pub const ECS_INGRESS_FROM_ALB: &str = "EcsSecurityGroupIngressFromAlb";
    pub const HTTP_LISTENER: &str = "ApplicationAlbHttpListener";
    pub const HTTP_INGRESS: &str = "AlbSecurityGroupIngressHttp";
    pub const HTTPS_LISTENER: &str = "ApplicationAlbHttpsListener";
    pub const HTTPS_INGRESS: &str = "AlbSecurityGroupIngressHttps";
    pub const HOST_ROUTING_RULE: &str = "ApplicationAlbHttpsListenerHostRoutingRule";

    // outputs
    pub const LOAD_BALANCER_DNS_OUTPUT: &str = "LoadBalancerDnsName";
    pub const CLUSTER_NAME_OUTPUT: &str = "ClusterName";
    pub const SERVICE_NAME_OUTPUT: &str = "ServiceName";
}

/// `<env>-application-cluster`
pub fn cluster_name(environment: &str) -> String {
    format!("{}-application-cluster", environment)
}

/// `<env>-application-alb`
pub fn load_balancer_name(environment: &str) -> String {
    format!("{}-application-alb", environment)
}

/// Builder for the application stack
#[derive(Debug, Clone)]
pub struct ApplicationStack {
    definition: StackDefinition,
    vpc_context: Option<VpcContext>,
}

impl ApplicationStack {
    pub fn new(definition: StackDefinition) -> Self {
        Self {
            definition,
            vpc_context: None,
        }
    }

    /// Subnets from a cached lookup, used where the stack file lists none
    pub fn with_vpc_context(mut self, context: VpcContext) -> Self {
        self.vpc_context = Some(context);
        self
    }

    pub fn definition(&self) -> &StackDefinition {
        &self.definition
    }

    pub fn stack_name(&self) -> &str {
        &self.definition.settings.name
    }

    /// Context-cache request for this stack's VPC
    pub fn lookup_request(&self) -> VpcLookupRequest {
        let settings = &self.definition.settings;
        VpcLookupRequest::new(
            &settings.account,
            &settings.region,
            &self.definition.network.vpc_id,
        )
    }

    /// VPC context made of the subnets listed in the stack file, if both lists are given
    pub fn configured_vpc_context(&self) -> Option<VpcContext> {
        let network = &self.definition.network;
        network.has_explicit_subnets().then(|| VpcContext {
            vpc_id: network.vpc_id.clone(),
            private_subnet_ids: network.private_subnets.clone(),
            public_subnet_ids: network.public_subnets.clone(),
            ..Default::default()
        })
    }

    /// Values for the parameters file
    pub fn parameter_values(image_tag: &ImageTag) -> ParameterValues {
        ParameterValues::new().with(IMAGE_TAG_PARAMETER, image_tag.as_str())
    }

    /// Private and public subnets; explicit lists win over the cached lookup
    fn subnets(&self) -> Result<(Vec<String>, Vec<String>)> {
        let network = &self.definition.network;

        let context = match &self.vpc_context {
            Some(ctx) if ctx.vpc_id != network.vpc_id => {
                return Err(AwsError::VpcContextMismatch {
                    expected: network.vpc_id.clone(),
                    found: ctx.vpc_id.clone(),
                });
            }
            other => other.as_ref(),
        };

        let pick = |explicit: &Vec<String>, cached: Option<&Vec<String>>| {
            if explicit.is_empty() {
                cached.cloned().unwrap_or_default()
            } else {
                explicit.clone()
            }
        };
        let private = pick(
            &network.private_subnets,
            context.map(|c| &c.private_subnet_ids),
        );
        let public = pick(
            &network.public_subnets,
            context.map(|c| &c.public_subnet_ids),
        );

        if private.is_empty() || public.is_empty() {
            return Err(AwsError::MissingSubnets {
                vpc_id: network.vpc_id.clone(),
            });
        }
        Ok((private, public))
    }

    /// Declare every resource, leaves first
    #[instrument(skip(self), fields(stack = %self.definition.settings.name))]
    pub fn build(&self) -> Result<ResourceGraph> {
        let settings = &self.definition.settings;
        let (private_subnets, public_subnets) = self.subnets()?;

        let mut graph = ResourceGraph::new(&settings.name);
        graph.set_description(format!(
            "{} ({}): ECS service behind an internet-facing ALB",
            settings.application, settings.environment
        ));
        graph.add_parameter(
            IMAGE_TAG_PARAMETER,
            Parameter::string()
                .with_description(IMAGE_TAG_DESCRIPTION)
                .with_allowed_pattern(
                    IMAGE_TAG_PATTERN,
                    "Letters, digits, '_', '.' and '-'; up to 128 characters",
                ),
        )?;
        let mut ami = serde_json::Map::new();
        ami.insert(
            ec2::AMI_MAPPING_KEY.to_string(),
            json!(self.definition.lookups.machine_image),
        );
        let mut regions = serde_json::Map::new();
        regions.insert(settings.region.clone(), Value::Object(ami));
        graph.add_mapping(ec2::AMI_MAPPING, Value::Object(regions));

        self.lookup_network(&mut graph)?;
        self.declare_cluster(&mut graph)?;
        self.declare_capacity(&mut graph, &private_subnets)?;
        self.lookup_artifacts(&mut graph)?;
        self.declare_task_definition(&mut graph)?;
        self.declare_service(&mut graph, &private_subnets)?;
        self.declare_load_balancing(&mut graph, &public_subnets)?;
        self.lookup_certificate(&mut graph)?;
        self.declare_listeners(&mut graph)?;
        self.declare_outputs(&mut graph)?;

        graph.validate()?;
        info!(resources = graph.len(), "Resource graph built");
        Ok(graph)
    }

    /// Build, tag and render
    #[instrument(skip(self), fields(stack = %self.definition.settings.name))]
    pub fn synth(&self) -> Result<Template> {
        let mut graph = self.build()?;
        graph.apply_tags(&stack_tags(&self.definition.settings), tag_resource);
        Ok(graph.to_template()?)
    }

    /// 1. Existing VPC and security groups
    fn lookup_network(&self, graph: &mut ResourceGraph) -> Result<()> {
        let network = &self.definition.network;
        debug!(vpc = %network.vpc_id, "Step 1: network lookups");

        graph.import(ExternalResource::new(
            ids::VPC,
            "AWS::EC2::VPC",
            &network.vpc_id,
        ))?;
        for (id, group_id) in [
            (ids::ECS_SECURITY_GROUP, &network.ecs_security_group),
            (ids::ALB_SECURITY_GROUP, &network.alb_security_group),
        ] {
            graph.import(
                ExternalResource::new(id, "AWS::EC2::SecurityGroup", group_id)
                    .with_attribute("GroupId", json!(group_id)),
            )?;
        }
        Ok(())
    }

    /// 2. Cluster
    fn declare_cluster(&self, graph: &mut ResourceGraph) -> Result<()> {
        let name = cluster_name(&self.definition.settings.environment);
        debug!(cluster = %name, "Step 2: cluster");
        graph.add(ecs::cluster(ids::CLUSTER, &name))?;
        Ok(())
    }

    /// 3. Auto Scaling group, capacity provider, attachment to the cluster
    fn declare_capacity(&self, graph: &mut ResourceGraph, subnets: &[String]) -> Result<()> {
        debug!("Step 3: capacity");

        graph.add(iam::instance_role(ids::INSTANCE_ROLE))?;
        graph.add(iam::instance_profile(ids::INSTANCE_PROFILE, ids::INSTANCE_ROLE))?;
        graph.add(ec2::launch_template(
            ids::LAUNCH_TEMPLATE,
            &ec2::LaunchTemplateSpec {
                instance_type: INSTANCE_TYPE,
                instance_profile: ids::INSTANCE_PROFILE,
                instance_role: ids::INSTANCE_ROLE,
                security_group: ids::ECS_SECURITY_GROUP,
                cluster: ids::CLUSTER,
            },
        ))?;
        graph.add(autoscaling::auto_scaling_group(
            ids::AUTO_SCALING_GROUP,
            ids::LAUNCH_TEMPLATE,
            subnets,
            ASG_CAPACITY,
            &format!("{}/{}", self.stack_name(), ids::AUTO_SCALING_GROUP),
        ))?;

        graph.add(ecs::capacity_provider(
            ids::CAPACITY_PROVIDER,
            ids::AUTO_SCALING_GROUP,
        ))?;

        graph.add(ecs::cluster_capacity_provider_associations(
            ids::CAPACITY_PROVIDER_ASSOCIATIONS,
            ids::CLUSTER,
        ))?;
        graph.attach(
            ids::CAPACITY_PROVIDER_ASSOCIATIONS,
            "CapacityProviders",
            reference(ids::CAPACITY_PROVIDER),
        )?;
        graph.attach(
            ids::CAPACITY_PROVIDER_ASSOCIATIONS,
            "DefaultCapacityProviderStrategy",
            ecs::capacity_provider_strategy(ids::CAPACITY_PROVIDER, 1),
        )?;
        Ok(())
    }

    /// 4. Container repository and log group
    fn lookup_artifacts(&self, graph: &mut ResourceGraph) -> Result<()> {
        let settings = &self.definition.settings;
        let lookups = &self.definition.lookups;
        debug!(repository = %lookups.repository, "Step 4: artifact lookups");

        graph.import(
            ExternalResource::new(ids::ECR_REPOSITORY, "AWS::ECR::Repository", &lookups.repository)
                .with_attribute(
                    "Arn",
                    sub(&format!(
                        "arn:${{AWS::Partition}}:ecr:{}:{}:repository/{}",
                        settings.region, settings.account, lookups.repository
                    )),
                )
                .with_attribute(
                    "RepositoryUri",
                    sub(&format!(
                        "{}.dkr.ecr.{}.${{AWS::URLSuffix}}/{}",
                        settings.account, settings.region, lookups.repository
                    )),
                ),
        )?;
        graph.import(
            ExternalResource::new(ids::LOG_GROUP, "AWS::Logs::LogGroup", &lookups.log_group)
                .with_attribute(
                    "Arn",
                    sub(&format!(
                        "arn:${{AWS::Partition}}:logs:{}:{}:log-group:{}:*",
                        settings.region, settings.account, lookups.log_group
                    )),
                ),
        )?;
        Ok(())
    }

    /// 5. Task definition, then its container
    fn declare_task_definition(&self, graph: &mut ResourceGraph) -> Result<()> {
        debug!("Step 5: task definition");

        graph.add(iam::task_execution_role(
            ids::EXECUTION_ROLE,
            ids::ECR_REPOSITORY,
            ids::LOG_GROUP,
        ))?;
        graph.add(iam::task_role(ids::TASK_ROLE))?;
        graph.add(ecs::task_definition(
            ids::TASK_DEFINITION,
            TASK_FAMILY,
            ids::EXECUTION_ROLE,
            ids::TASK_ROLE,
        ))?;

        let image = join(
            "",
            vec![
                get_att(ids::ECR_REPOSITORY, "RepositoryUri"),
                json!(":"),
                reference(IMAGE_TAG_PARAMETER),
            ],
        );
        graph.attach(
            ids::TASK_DEFINITION,
            "ContainerDefinitions",
            ecs::container_definition(&ecs::ContainerSpec {
                name: CONTAINER_NAME,
                image,
                memory_reservation_mib: MEMORY_RESERVATION_MIB,
                log_group: ids::LOG_GROUP,
                log_stream_prefix: LOG_STREAM_PREFIX,
                container_port: CONTAINER_PORT,
            }),
        )?;
        Ok(())
    }

    /// 6. Service
    fn declare_service(&self, graph: &mut ResourceGraph, subnets: &[String]) -> Result<()> {
        debug!(service = SERVICE_NAME, "Step 6: service");

        graph.add(
            ecs::service(
                ids::SERVICE,
                &ecs::ServiceSpec {
                    service_name: SERVICE_NAME,
                    cluster: ids::CLUSTER,
                    task_definition: ids::TASK_DEFINITION,
                    capacity_provider: ids::CAPACITY_PROVIDER,
                    security_group: ids::ECS_SECURITY_GROUP,
                    subnets,
                    desired_count: DESIRED_COUNT,
                },
            )
            .with_dependency(ids::CAPACITY_PROVIDER_ASSOCIATIONS),
        )?;
        Ok(())
    }

    /// 7. Load balancer, target group, service registration
    fn declare_load_balancing(&self, graph: &mut ResourceGraph, subnets: &[String]) -> Result<()> {
        let name = load_balancer_name(&self.definition.settings.environment);
        debug!(load_balancer = %name, "Step 7: load balancing");

        graph.add(elbv2::load_balancer(
            ids::LOAD_BALANCER,
            &name,
            ids::ALB_SECURITY_GROUP,
            subnets,
        ))?;
        graph.add(elbv2::target_group(
            ids::TARGET_GROUP,
            ids::VPC,
            CONTAINER_PORT,
            &elbv2::HealthCheck {
                path: HEALTH_CHECK_PATH,
                healthy_http_codes: HEALTH_CHECK_CODES,
                interval_seconds: HEALTH_CHECK_INTERVAL_SECS,
            },
        ))?;

        graph.attach(
            ids::SERVICE,
            "LoadBalancers",
            ecs::load_balancer_target(CONTAINER_NAME, CONTAINER_PORT, ids::TARGET_GROUP),
        )?;
        graph.resource_mut(ids::SERVICE)?.set_property(
            "HealthCheckGracePeriodSeconds",
            json!(HEALTH_CHECK_GRACE_PERIOD_SECS),
        );
        graph.add(ec2::ingress_from_group(
            ids::ECS_INGRESS_FROM_ALB,
            ids::ECS_SECURITY_GROUP,
            ids::ALB_SECURITY_GROUP,
            CONTAINER_PORT,
        ))?;
        Ok(())
    }

    /// 8. Certificate
    fn lookup_certificate(&self, graph: &mut ResourceGraph) -> Result<()> {
        let arn = &self.definition.lookups.certificate_arn;
        debug!(certificate = %arn, "Step 8: certificate lookup");
        graph.import(ExternalResource::new(
            ids::CERTIFICATE,
            "AWS::CertificateManager::Certificate",
            arn,
        ))?;
        Ok(())
    }

    /// 9. Listeners and the host routing rule
    fn declare_listeners(&self, graph: &mut ResourceGraph) -> Result<()> {
        debug!("Step 9: listeners");

        graph.add(elbv2::http_listener(
            ids::HTTP_LISTENER,
            ids::LOAD_BALANCER,
            HTTP_PORT,
            elbv2::redirect_action("HTTPS", HTTPS_PORT),
        ))?;
        graph.add(ec2::ingress_from_anywhere(
            ids::HTTP_INGRESS,
            ids::ALB_SECURITY_GROUP,
            HTTP_PORT,
        ))?;

        graph.add(elbv2::https_listener(
            ids::HTTPS_LISTENER,
            ids::LOAD_BALANCER,
            HTTPS_PORT,
            ids::CERTIFICATE,
            elbv2::fixed_response_action(NOT_FOUND_STATUS, NOT_FOUND_CONTENT_TYPE, NOT_FOUND_BODY),
        ))?;
        graph.add(ec2::ingress_from_anywhere(
            ids::HTTPS_INGRESS,
            ids::ALB_SECURITY_GROUP,
            HTTPS_PORT,
        ))?;

        graph.add(elbv2::host_header_rule(
            ids::HOST_ROUTING_RULE,
            ids::HTTPS_LISTENER,
            HOST_RULE_PRIORITY,
            &[DOMAIN_NAME],
            elbv2::forward_action(ids::TARGET_GROUP),
        ))?;

        // The target group must be behind a listener before the service
        // registers into it
        graph.add_dependency(ids::SERVICE, ids::HOST_ROUTING_RULE)?;
        Ok(())
    }

    fn declare_outputs(&self, graph: &mut ResourceGraph) -> Result<()> {
        graph.add_output(
            ids::LOAD_BALANCER_DNS_OUTPUT,
            Output::new(get_att(ids::LOAD_BALANCER, "DNSName"))
                .with_description("Public DNS name of the load balancer"),
        )?;
        graph.add_output(
            ids::CLUSTER_NAME_OUTPUT,
            Output::new(reference(ids::CLUSTER)).with_description("ECS cluster name"),
        )?;
        graph.add_output(
            ids::SERVICE_NAME_OUTPUT,
            Output::new(get_att(ids::SERVICE, "Name")).with_description("ECS service name"),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
