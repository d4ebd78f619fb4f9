use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::models::PriceSeries;

pub fn write_json<T: Serialize, W: Write>(value: &T, mut out: W) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    out.write_all(json.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Prints the series with its two index levels first, then the data columns.
pub fn write_table<W: Write>(series: &PriceSeries, mut out: W) -> Result<()> {
    let symbol_width = series
        .rows
        .iter()
        .map(|r| r.symbol.len())
        .max()
        .unwrap_or(0)
        .max("symbol".len());

    write!(out, "{:<25} {:<symbol_width$}", PriceSeries::INDEX[0], PriceSeries::INDEX[1])?;
    for column in PriceSeries::COLUMNS {
        write!(out, " {:>12}", column)?;
    }
    writeln!(out)?;

    for row in &series.rows {
        writeln!(
            out,
            "{:<25} {:<symbol_width$} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12} {:>12.4}",
            row.timestamp.to_rfc3339(),
            row.symbol,
            row.open_price,
            row.high,
            row.low,
            row.close_price,
            row.volume,
            row.price,
        )?;
    }
    Ok(())
}
