//! Process-wide configuration.
//!
//! The configuration is built once at start-up and handed to the pipeline explicitly.

pub const DEFAULT_TABLE_NAME: &str = "Competitions";
pub const DEFAULT_PARTITION_KEY: &str = "region";
pub const DEFAULT_SORT_KEY: &str = "id";

pub const DEFAULT_DOMAIN: &str = "cal.ffgti.org";
pub const DEFAULT_COMPANY: &str = "Finn Ickler";
pub const DEFAULT_PRODUCT: &str = "compCal";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub table: TableConfig,
    pub calendar: CalendarConfig,
}

/// Where the competitions are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    /// Attribute name of the partition key, bound as `#key` in filter expressions.
    pub partition_key: String,
    /// Not part of any filter; kept so the store reports the full key schema.
    pub sort_key: String,
    /// Overrides the store endpoint, e.g. for DynamoDB Local.
    pub endpoint_url: Option<String>,
    pub aws_region: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: String::from(DEFAULT_TABLE_NAME),
            partition_key: String::from(DEFAULT_PARTITION_KEY),
            sort_key: String::from(DEFAULT_SORT_KEY),
            endpoint_url: None,
            aws_region: None,
        }
    }
}

/// Metadata of the generated calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    pub domain: String,
    pub company: String,
    pub product: String,
    pub timezone: String,
    pub organizer_email: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            domain: String::from(DEFAULT_DOMAIN),
            company: String::from(DEFAULT_COMPANY),
            product: String::from(DEFAULT_PRODUCT),
            timezone: String::from(DEFAULT_TIMEZONE),
            organizer_email: None,
        }
    }
}

impl CalendarConfig {
    pub fn prod_id(&self) -> String {
        format!("-//{}//{}//EN", self.company, self.product)
    }

    /// The organizer address used when a competition names none.
    pub fn organizer_email(&self) -> String {
        self.organizer_email
            .clone()
            .unwrap_or_else(|| format!("noreply@{}", self.domain))
    }
}

#[cfg(feature = "clap")]
pub use self::args::ConfigArgs;

#[cfg(feature = "clap")]
mod args {
    use clap::Args;

    use super::*;

    /// Configuration as read from the command line or the environment.
    #[derive(Debug, Clone, Args)]
    pub struct ConfigArgs {
        /// the competitions table
        #[arg(long, env = "TABLE_NAME", default_value = DEFAULT_TABLE_NAME)]
        pub table_name: String,
        /// the partition key attribute of the table
        #[arg(long, env = "TABLE_PARTITION_KEY", default_value = DEFAULT_PARTITION_KEY)]
        pub partition_key: String,
        /// the sort key attribute of the table
        #[arg(long, env = "TABLE_SORT_KEY", default_value = DEFAULT_SORT_KEY)]
        pub sort_key: String,
        /// a custom store endpoint
        #[arg(long, env = "AWS_ENDPOINT_URL")]
        pub endpoint_url: Option<String>,
        /// the AWS region of the store
        #[arg(long, env = "AWS_REGION")]
        pub aws_region: Option<String>,
        /// the domain used in event UIDs
        #[arg(long, env = "CALENDAR_DOMAIN", default_value = DEFAULT_DOMAIN)]
        pub domain: String,
        /// the company part of the product identifier
        #[arg(long, env = "CALENDAR_COMPANY", default_value = DEFAULT_COMPANY)]
        pub company: String,
        /// the product part of the product identifier
        #[arg(long, env = "CALENDAR_PRODUCT", default_value = DEFAULT_PRODUCT)]
        pub product: String,
        /// the timezone of competition start and end times
        #[arg(long, env = "CALENDAR_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
        pub timezone: String,
        /// the organizer address for competitions without one
        #[arg(long, env = "CALENDAR_ORGANIZER_EMAIL")]
        pub organizer_email: Option<String>,
    }

    impl From<ConfigArgs> for Config {
        fn from(value: ConfigArgs) -> Self {
            Config {
                table: TableConfig {
                    table_name: value.table_name,
                    partition_key: value.partition_key,
                    sort_key: value.sort_key,
                    endpoint_url: value.endpoint_url,
                    aws_region: value.aws_region,
                },
                calendar: CalendarConfig {
                    domain: value.domain,
                    company: value.company,
                    product: value.product,
                    timezone: value.timezone,
                    organizer_email: value.organizer_email,
                },
            }
        }
    }

}
