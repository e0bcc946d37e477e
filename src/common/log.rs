use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{runtime::ConfigErrors, Appender, Config, Root},
    encode::pattern::PatternEncoder,
    Handle,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSetupError {
    #[error("failed to open log file: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid log config: {0}")]
    Config(#[from] ConfigErrors),
    #[error("logger already set: {0}")]
    Logger(#[from] SetLoggerError),
}

pub fn setup_log(
    log_level: Option<LevelFilter>,
    log_file_path: Option<String>,
) -> Result<Handle, LogSetupError> {
    let log_level = log_level.unwrap_or(LevelFilter::Info);

    let pattern_encoder = Box::new(PatternEncoder::new(
        "{d(%Y-%m-%d %H:%M:%S%.6f)} [{l}] {f}:{L} {T} - {m}\n",
    ));

    let appender_name = "appender";

    let config_builder = match log_file_path {
        Some(path) => {
            let logfile = FileAppender::builder()
                .encoder(pattern_encoder)
                .build(path)?;
            Config::builder().appender(Appender::builder().build(appender_name, Box::new(logfile)))
        }
        None => {
            let console = ConsoleAppender::builder().encoder(pattern_encoder).build();
            Config::builder().appender(Appender::builder().build(appender_name, Box::new(console)))
        }
    };

    let root = Root::builder().appender(appender_name).build(log_level);
    let config = config_builder.build(root)?;
    Ok(log4rs::init_config(config)?)
}
