//! Resource catalog
//!
//! Maps each API model to its route. Client methods take any `AsRef<str>`
//! route, so unlisted routes can still be passed as plain strings.

use std::fmt;
use std::str::FromStr;

macro_rules! resources {
    ($($variant:ident => $name:literal, $path:literal;)+) => {
        /// A route to a model on the Bleemeo API.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Resource {
            $($variant,)+
        }

        impl Resource {
            pub const ALL: &'static [Resource] = &[$(Resource::$variant,)+];

            /// Route relative to the API URL, e.g. `v1/metric/`.
            pub const fn route(self) -> &'static str {
                match self {
                    $(Resource::$variant => concat!("v1/", $path, "/"),)+
                }
            }

            /// snake_case name, as accepted by `FromStr`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Resource::$variant => $name,)+
                }
            }
        }
    };
}

resources! {
    Account => "account", "account";
    AccountConfig => "account_config", "accountconfig";
    AgentConfig => "agent_config", "agentconfig";
    Application => "application", "application";
    AuditLog => "auditlog", "auditlog";
    Agent => "agent", "agent";
    AgentFact => "agent_fact", "agentfact";
    AgentType => "agent_type", "agenttype";
    AwsIntegration => "aws_integration", "awsintegration";
    ContactsGroup => "contacts_group", "contactsgroup";
    Container => "container", "container";
    Dashboard => "dashboard", "dashboard";
    Event => "event", "event";
    GloutonConfigItem => "glouton_config_item", "gloutonconfigitem";
    GloutonCrashReport => "glouton_crash_report", "gloutoncrashreport";
    GloutonDiagnostic => "glouton_diagnostic", "gloutondiagnostic";
    Healthcheck => "healthcheck", "healthcheck";
    Integration => "integration", "integration";
    IntegrationTemplate => "integration_template", "integrationtemplate";
    Limit => "limit", "limit";
    Metric => "metric", "metric";
    MetricAnnotation => "metric_annotation", "metricannotation";
    MetricName => "metric_name", "metricname";
    MetricOperation => "metric_operation", "metricoperation";
    MetricTemplateGroup => "metric_template_group", "metrictemplategroup";
    NotificationExecution => "notification_execution", "notificationexecution";
    NotificationRule => "notification_rule", "notificationrule";
    RecordingRule => "recording_rule", "recordingrule";
    Report => "report", "report";
    Silence => "silence", "silence";
    SilenceRecurrent => "silence_recurrent", "silencerecurrent";
    Slo => "slo", "slo";
    ServerGroup => "server_group", "servergroup";
    Service => "service", "service";
    Session => "session", "session";
    Tag => "tag", "tag";
    User => "user", "user";
    Widget => "widget", "widget";
}

impl AsRef<str> for Resource {
    fn as_ref(&self) -> &str {
        self.route()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource: {0}")]
pub struct UnknownResource(String);

impl FromStr for Resource {
    type Err = UnknownResource;

    /// Accepts the snake_case name or the bare route segment
    /// (`metric_name` and `metricname` both parse).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == wanted || r.name().replace('_', "") == wanted)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}
