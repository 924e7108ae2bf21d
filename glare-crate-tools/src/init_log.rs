use std::io::Write;

/// 初始化全局 logger
///
/// 默认 Info 级别，RUST_LOG 可以覆盖。
/// 一行的结构：`[时间] LEVEL target 正文`，target 用暗色弱化。
pub fn init_log() {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            let level_style = buf.default_level_style(record.level());
            let dim_style = anstyle::Style::new()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightBlack)));

            writeln!(
                buf,
                "{dim_style}[{}]{dim_style:#} {level_style}{:<5}{level_style:#} {dim_style}{}{dim_style:#} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.init();
}
