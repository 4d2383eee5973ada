
use anyhow::Context;
use std::io::{BufReader, BufWriter, Read, Write};
use std::fs::File;
use std::path::Path;

fn is_gzip(filename: &Path) -> bool {
    filename.extension().unwrap_or_default() == "gz"
}

/// Opens a file for reading, decompressing if it ends with .gz
/// # Errors
/// * if the file does not open
pub fn open_input(filename: &Path) -> anyhow::Result<Box<dyn Read>> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn Read> = if is_gzip(filename) {
        Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Loads a JSON file into some type
/// # Arguments
/// * `filename` - the file path to open and parse
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let reader = open_input(filename)?;
    let result: T = serde_json::from_reader(reader)
        .with_context(|| format!("Error while deserializing {filename:?}:"))?;
    Ok(result)
}

fn write_json<T: serde::Serialize, W: Write>(data: &T, writer: &mut W, pretty: bool) -> serde_json::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, data)
    } else {
        serde_json::to_writer(writer, data)
    }
}

/// Saves a serializable struct to JSON, compressing if the filename ends with .gz
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to
/// * `pretty` - if true, the output is indented
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
/// * if the gzip stream cannot be finished
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path, pretty: bool) -> anyhow::Result<()> {
    let file = File::create(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;
    let mut writer = BufWriter::new(file);

    if is_gzip(out_filename) {
        let mut encoder = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
        write_json(data, &mut encoder, pretty)
            .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
        // writes the gzip trailer
        writer = encoder.finish()
            .with_context(|| format!("Error while finishing gzip stream for {out_filename:?}:"))?;
    } else {
        write_json(data, &mut writer, pretty)
            .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    }

    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}
