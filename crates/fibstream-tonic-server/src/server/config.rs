use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use fibstream::{
    DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE, DEFAULT_N_LIMIT, DEFAULT_STREAM_N_LIMIT, Limits,
};

/// Runtime configuration for the `fibstream-tonic-server` binary.
///
/// Values come from CLI arguments or environment variables (a `.env` file is
/// loaded first), with defaults suitable for a single instance.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fibstream-tonic-server",
    version,
    about = "A gRPC service for arbitrary-precision Fibonacci sequences"
)]
pub struct CliArgs {
    /// Largest `n` accepted by the unary `Fibonacci` call.
    ///
    /// Environment variable: `N_LIMIT`
    #[arg(long, env = "N_LIMIT", default_value_t = DEFAULT_N_LIMIT)]
    pub n_limit: usize,

    /// Largest `n` accepted by `FibonacciStream`.
    ///
    /// Environment variable: `STREAM_N_LIMIT`
    #[arg(long, env = "STREAM_N_LIMIT", default_value_t = DEFAULT_STREAM_N_LIMIT)]
    pub stream_n_limit: usize,

    /// Smallest accepted `chunk_size`.
    ///
    /// Environment variable: `MIN_CHUNK_SIZE`
    #[arg(long, env = "MIN_CHUNK_SIZE", default_value_t = DEFAULT_MIN_CHUNK_SIZE)]
    pub min_chunk_size: usize,

    /// Largest accepted `chunk_size`.
    ///
    /// Environment variable: `MAX_CHUNK_SIZE`
    #[arg(long, env = "MAX_CHUNK_SIZE", default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    pub max_chunk_size: usize,

    /// Capacity of the response buffer between the computation and the gRPC
    /// stream.
    ///
    /// Once this many chunks are queued the computation blocks until the
    /// client reads more. Lower values tighten backpressure; higher values
    /// allow deeper pipelining.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight requests to finish after Ctrl+C before
    /// cancelling them.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 20)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/fibstream.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub limits: Limits,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let limits = Limits {
            n_limit: args.n_limit,
            stream_n_limit: args.stream_n_limit,
            min_chunk_size: args.min_chunk_size,
            max_chunk_size: args.max_chunk_size,
        };
        limits
            .validate()
            .context("MIN_CHUNK_SIZE and MAX_CHUNK_SIZE do not admit any chunk size")?;

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            limits,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}
