mod settings;

pub use settings::{
    CloudflareConfig, Credentials, DaemonConfig, IpConfig, Settings, ENV_API_EMAIL, ENV_API_KEY,
    ENV_ZONE_ID,
};
