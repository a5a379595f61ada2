use clap::Parser;

/// Storefront notification service CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "storefront-notify",
    version,
    about = "Webhook notifications for storefront stock, sales and daily summaries"
)]
pub struct Cli {
    /// SQLite database URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Address the HTTP API listens on
    #[arg(long)]
    pub bind: Option<String>,

    /// Daily summary interval in seconds (0 disables)
    #[arg(long)]
    pub summary_interval: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "storefront-notify",
            "--database-url",
            "sqlite::memory:",
            "--bind",
            "127.0.0.1:8080",
            "--summary-interval",
            "3600",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(cli.summary_interval, Some(3600));
    }

    #[test]
    fn flags_are_optional() {
        let cli = Cli::try_parse_from(["storefront-notify"]).unwrap();
        assert!(cli.database_url.is_none());
        assert!(cli.summary_interval.is_none());
    }
}
