use clap::Parser;

#[derive(Debug, Parser)]
pub struct Config {
    #[clap(short = 'H', long, env, default_value_t = String::from("127.0.0.1"))]
    pub host: String,
    #[clap(short, long, env, default_value_t = 7230)]
    pub port: u16,

    #[clap(env, default_value_t = String::from("production"))]
    pub env: String,

    /// Upper bound, in milliseconds, that a change feed long-poll may hold
    /// the request open.
    #[clap(long, env, default_value_t = 25_000)]
    pub feed_poll_timeout_ms: u64,
}
