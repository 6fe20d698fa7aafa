//! A `tracing` subscriber with a reloadable filter, plus a small
//! BSD-syslog layer for when `target = "syslog"` is configured. Parsing
//! the configuration file itself remains an external collaborator.

use std::ffi::OsString;
use std::fmt;
use std::os::unix::net::UnixDatagram;

use tracing::field::{self, Field};
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

use crate::config::{LogLevel, LogTarget, LoggingConfig};

/// The state of the crate's logger.
///
/// Holds a handle to the active [`EnvFilter`] so that a configuration
/// reload can change verbosity without restarting the subscriber.
pub struct Logger {
    filter: Handle<EnvFilter, Registry>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// Launch the logger.
    ///
    /// # Panics
    ///
    /// Panics if a global [`tracing`] subscriber has already been set.
    pub fn launch(config: &LoggingConfig) -> Result<&'static Logger, String> {
        let filter = make_env_filter(config)?;
        let (filter, filter_handle) = reload::Layer::new(filter);

        match &config.target {
            #[cfg(unix)]
            LogTarget::Syslog => {
                use std::net::{Ipv4Addr, SocketAddr};

                let paths = ["/dev/log", "/var/run/syslog", "/var/run/log"];
                let transport = if let Some(unix) = paths.iter().find_map(|p| connect_unix(p).ok())
                {
                    Transport::Unix(unix)
                } else if let Ok(tcp) = std::net::TcpStream::connect((Ipv4Addr::LOCALHOST, 601)) {
                    Transport::Tcp(tcp)
                } else if let Ok(udp) = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)) {
                    Transport::Udp {
                        local: udp,
                        server: SocketAddr::from((Ipv4Addr::LOCALHOST, 514)),
                    }
                } else {
                    return Err("could not reach a syslog transport".into());
                };

                let (app_name, proc_id) = get_process_info();
                let layer = Syslog {
                    facility: 1, // User level
                    hostname: hostname::get().unwrap_or_default(),
                    app_name,
                    proc_id,
                    transport,
                };

                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            }
            LogTarget::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|err| format!("could not open log file '{path}': {err}"))?;
                let layer = FmtLayer::new().with_ansi(false).with_writer(file);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            }
            LogTarget::Stdout => {
                let layer = FmtLayer::new()
                    .with_ansi(supports_color::on(supports_color::Stream::Stdout).is_some())
                    .with_writer(std::io::stdout);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            }
            LogTarget::Stderr => {
                let layer = FmtLayer::new()
                    .with_ansi(supports_color::on(supports_color::Stream::Stderr).is_some())
                    .with_writer(std::io::stderr);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .init();
            }
        }

        Ok(Box::leak(Box::new(Self {
            filter: filter_handle,
        })))
    }

    /// Reload the filter after a configuration change.
    pub fn apply(&self, config: &LoggingConfig) -> Result<(), String> {
        self.filter
            .reload(make_env_filter(config)?)
            .map_err(|_| "could not reload log filter".into())
    }
}

fn make_env_filter(config: &LoggingConfig) -> Result<EnvFilter, String> {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::from(config.level).into());
    for target in &config.trace_targets {
        filter = filter
            .add_directive(target.parse().map_err(|_| format!("invalid trace target: '{target}'"))?);
    }
    Ok(filter)
}

fn get_process_info() -> (OsString, u32) {
    let name = std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|os_name| os_name.to_owned()))
        .unwrap_or_default();
    (name, std::process::id())
}

fn connect_unix(path: impl AsRef<std::path::Path>) -> std::io::Result<UnixDatagram> {
    let sock = UnixDatagram::unbound()?;
    sock.connect(path.as_ref())?;
    Ok(sock)
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

/// A minimal BSD syslog ([RFC 3164]) `tracing` layer.
///
/// [RFC 3164]: https://www.rfc-editor.org/rfc/rfc3164
struct Syslog {
    facility: u8,
    hostname: OsString,
    app_name: OsString,
    proc_id: u32,
    transport: Transport,
}

#[derive(Debug)]
enum Transport {
    Unix(UnixDatagram),
    Udp {
        local: std::net::UdpSocket,
        server: std::net::SocketAddr,
    },
    Tcp(std::net::TcpStream),
}

impl Transport {
    fn send(&self, buf: &[u8]) -> std::io::Result<()> {
        use std::io::Write;
        match self {
            Transport::Unix(sock) => {
                sock.send(buf)?;
            }
            Transport::Udp { local, server } => {
                local.send_to(buf, server)?;
            }
            Transport::Tcp(stream) => {
                let mut s: &std::net::TcpStream = stream;
                s.write_all(buf)?;
                s.flush()?;
            }
        }
        Ok(())
    }
}

impl<S> Layer<S> for Syslog
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        use std::io::Write;

        let meta = event.metadata();
        let severity = match *meta.level() {
            Level::ERROR => 3,
            Level::WARN => 4,
            Level::INFO => 6,
            Level::DEBUG | Level::TRACE => 7,
        };
        let prival = self.facility << 3 | severity;
        let timestamp = jiff::Zoned::now().strftime("%b %e %T");
        let hostname = self.hostname.to_string_lossy();
        let app_name = self.app_name.to_string_lossy();
        let proc_id = &self.proc_id;

        let mut buf = Vec::new();
        let _ = write!(buf, "<{prival}>{timestamp} {hostname} {app_name}[{proc_id}]: ");

        let mut visitor = Visitor {
            writer: &mut buf,
            result: Ok(()),
        };
        event.record(&mut visitor);
        let _ = buf.write(b"\n");

        // A broken syslog transport is not something the caller can act on
        // mid-event; dropping the message is preferable to panicking the
        // logging layer.
        let _ = self.transport.send(&buf);
    }
}

struct Visitor<'a> {
    writer: &'a mut Vec<u8>,
    result: std::io::Result<()>,
}

impl field::Visit for Visitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if self.result.is_err() {
            return;
        }
        if field.name() == "message" {
            self.record_debug(field, &format_args!("{value}"))
        } else {
            self.record_debug(field, &value)
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        use std::io::Write;
        if self.result.is_err() {
            return;
        }
        if field.name() == "message" {
            self.result = write!(self.writer, "{value:?}");
        }
    }
}
