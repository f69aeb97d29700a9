use crate::numerical::ode_error::OdeError;
use chrono::Local;
use csv::Writer;
use log::{LevelFilter, info};
use nalgebra::{DMatrix, DVector};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// `None` keeps logging silent, `"off"`/`"none"` as well
pub fn parse_loglevel(loglevel: &Option<String>) -> Result<Option<LevelFilter>, OdeError> {
    let Some(level) = loglevel else {
        return Ok(None);
    };
    let filter = match level.to_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" | "none" => return Ok(None),
        other => {
            return Err(OdeError::InvalidOptions(format!(
                "loglevel must be debug, info, warn, error, off or none, got {}",
                other
            )));
        }
    };
    Ok(Some(filter))
}

/// Terminal logger, plus a `log_<date>.txt` file when `to_file` is set.
/// A logger installed earlier stays in place.
pub fn init_logger(loglevel: &Option<String>, to_file: bool) -> Result<(), OdeError> {
    let Some(log_option) = parse_loglevel(loglevel)? else {
        return Ok(());
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if to_file {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        loggers.push(WriteLogger::new(log_option, Config::default(), File::create(name)?));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// tab separated table: argument column, then one column per variable
pub fn save_matrix_to_file<P: AsRef<Path>>(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: P,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> Result<(), OdeError> {
    let mut file = File::create(filename.as_ref())?;
    let mut headers_with_x = Vec::with_capacity(headers.len() + 1);
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writeln!(file, "{}", headers_with_x.join("\t"))?;
    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = Vec::with_capacity(row.len() + 1);
        row_data.push(x_mesh[i].to_string());
        row_data.extend(row.iter().map(|&val| val.to_string()));
        writeln!(file, "{}", row_data.join("\t"))?;
    }
    info!("result saved to {}", filename.as_ref().display());
    Ok(())
}

pub fn save_matrix_to_csv<P: AsRef<Path>>(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: P,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> Result<(), OdeError> {
    let file = File::create(filename.as_ref())?;
    let mut writer = Writer::from_writer(file);

    let mut headers_with_x = Vec::with_capacity(headers.len() + 1);
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;

    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = Vec::with_capacity(row.len() + 1);
        row_data.push(x_mesh[i].to_string());
        row_data.extend(row.iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    info!("result saved to {}", filename.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel(&None).unwrap(), None);
        assert_eq!(parse_loglevel(&Some("off".to_string())).unwrap(), None);
        assert_eq!(
            parse_loglevel(&Some("Warn".to_string())).unwrap(),
            Some(LevelFilter::Warn)
        );
        assert!(matches!(
            parse_loglevel(&Some("verbose".to_string())),
            Err(OdeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_save_matrix_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let y = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let t = DVector::from_vec(vec![0.0, 0.1]);
        let headers = vec!["y0".to_string(), "y1".to_string()];
        save_matrix_to_file(&y, &headers, &path, &t, "t").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "t\ty0\ty1");
        assert_eq!(lines[2], "0.1\t3\t4");
    }
}
