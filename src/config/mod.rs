use crate::util::env::{get_env_or, get_vec_from_env_or, load_dotenv};

pub mod db;
pub mod rd;

// Cache key prefixes. Keys are always built through these so the layout
// lives in exactly one place.
pub const POST_DETAILS_PREFIX: &str = "post:details:";
pub const TAG_POSTS_PREFIX: &str = "tag:posts:";

pub fn post_details_key(id: &str) -> String {
    format!("{POST_DETAILS_PREFIX}{id}")
}

pub fn tag_posts_key(normalized_tag: &str) -> String {
    format!("{TAG_POSTS_PREFIX}{normalized_tag}")
}

// Pagination defaults for the read API.
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub kafka: KafkaConfig,
    pub valkey: ValkeyConfig,
    pub mysql: MysqlConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    pub posts_topic: String,
    pub post_tags_topic: String,
}

#[derive(Debug, Clone)]
pub struct ValkeyConfig {
    pub addr: String,
}

#[derive(Debug, Clone)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub elasticsearch_url: Option<String>,
    pub elasticsearch_index_prefix: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let cfg = AppConfig {
            http: HttpConfig::from_env(),
            kafka: KafkaConfig::from_env(),
            valkey: ValkeyConfig::from_env(),
            mysql: MysqlConfig::from_env(),
            log: LogConfig::from_env(),
        };
        cfg.validate();
        cfg
    }

    /// Validates the configuration and panics if any validation fails.
    pub fn validate(&self) {
        let mut errors = Vec::new();

        if self.kafka.brokers.is_empty() {
            errors.push("KAFKA_BROKERS must be set (comma-separated list)".to_string());
        }
        if self.kafka.brokers.iter().any(|b| b.is_empty()) {
            errors.push("KAFKA_BROKERS contains an empty entry".to_string());
        }
        if self.valkey.addr.is_empty() {
            errors.push("VALKEY_ADDR cannot be empty".to_string());
        }
        if self.mysql.host.is_empty() {
            errors.push("MYSQL_HOST cannot be empty".to_string());
        }
        if self.mysql.dbname.is_empty() {
            errors.push("MYSQL_DBNAME cannot be empty".to_string());
        }

        if !errors.is_empty() {
            panic!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        // Historical name, kept for compatibility with existing deployments.
        let port = get_env_or("FIBER_PORT", 3001).unwrap();
        HttpConfig { port }
    }
}

impl KafkaConfig {
    pub fn from_env() -> Self {
        let brokers = get_vec_from_env_or("KAFKA_BROKERS", vec![]).unwrap();
        let group_id = get_env_or("KAFKA_GROUP_ID", "tag-service-group".to_string()).unwrap();
        let posts_topic =
            get_env_or("KAFKA_POSTS_TOPIC", "post-db.okblog.posts".to_string()).unwrap();
        let post_tags_topic = get_env_or(
            "KAFKA_POST_TAGS_TOPIC",
            "post-db.okblog.post_tags".to_string(),
        )
        .unwrap();

        KafkaConfig {
            brokers,
            group_id,
            posts_topic,
            post_tags_topic,
        }
    }
}

impl ValkeyConfig {
    pub fn from_env() -> Self {
        let addr = get_env_or("VALKEY_ADDR", "localhost:6379".to_string()).unwrap();
        ValkeyConfig { addr }
    }

    // The pool manager wants a URL; the environment carries a bare host:port.
    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }
}

impl MysqlConfig {
    pub fn from_env() -> Self {
        let host = get_env_or("MYSQL_HOST", "localhost".to_string()).unwrap();
        let port = get_env_or("MYSQL_PORT", 3306).unwrap();
        let user = get_env_or("MYSQL_USER", "root".to_string()).unwrap();
        let password = get_env_or("MYSQL_PASSWORD", String::new()).unwrap();
        let dbname = get_env_or("MYSQL_DBNAME", "okblog".to_string()).unwrap();

        MysqlConfig {
            host,
            port,
            user,
            password,
            dbname,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let elasticsearch_url = std::env::var("ELASTICSEARCH_URL").ok().filter(|s| !s.is_empty());
        let elasticsearch_index_prefix =
            get_env_or("ELASTICSEARCH_INDEX_PREFIX", "tag-service".to_string()).unwrap();

        LogConfig {
            elasticsearch_url,
            elasticsearch_index_prefix,
        }
    }
}
