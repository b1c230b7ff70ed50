use crate::errors::EpwError;
use csv::ReaderBuilder as CsvReaderBuilder;
use std::fs;
use std::path::Path;

pub const EPW_HEADER_LINES: usize = 8;

const COLUMN_LATITUDE: usize = 6;
const COLUMN_LONGITUDE: usize = 7;
const COLUMN_TIME_ZONE: usize = 8;

const COLUMN_YEAR: usize = 0;
const COLUMN_MONTH: usize = 1;
const COLUMN_DAY: usize = 2;
const COLUMN_HOUR: usize = 3;
const COLUMN_AIR_TEMP: usize = 6; // dry bulb temp in degrees
const COLUMN_DEW_POINT: usize = 7; // dew point temp in degrees
const COLUMN_RELATIVE_HUMIDITY: usize = 8; // in %
const COLUMN_PRESSURE: usize = 9; // atmospheric station pressure in Pa
const COLUMN_HORIZONTAL_IR: usize = 12; // horizontal infrared radiation intensity in Wh/m2
const COLUMN_GLOBAL_HORIZONTAL_RAD: usize = 13; // in Wh/m2
const COLUMN_DNI_RAD: usize = 14; // direct beam normal irradiation in Wh/m2
const COLUMN_DIF_RAD: usize = 15; // diffuse irradiation (horizontal plane) in Wh/m2
const COLUMN_WIND_DIRECTION: usize = 20; // wind direction in degrees
const COLUMN_WIND_SPEED: usize = 21; // wind speed in m/sec
const COLUMN_PRECIPITATION: usize = 33; // liquid precipitation depth in mm

const GROUND_TEMPERATURE_LINE: usize = 3;
const GROUND_TEMPERATURE_BLOCK: usize = 16;

#[derive(Clone, Debug, PartialEq)]
pub struct EpwLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// hours from GMT
    pub time_zone: f64,
}

/// Undisturbed ground temperatures at one depth, by month
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTemperature {
    pub depth: f64,
    pub monthly: [f64; 12],
}

/// One hourly record of the EPW, restricted to the columns the engine reads
#[derive(Clone, Debug, PartialEq)]
pub struct EpwRecord {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub dry_bulb: f64,
    pub dew_point: f64,
    pub relative_humidity: f64,
    pub pressure: f64,
    pub horizontal_infrared: f64,
    pub global_horizontal: f64,
    pub direct_normal: f64,
    pub diffuse_horizontal: f64,
    pub wind_direction: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
}

/// Values written back over a record of the rural file
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MorphedRecord {
    pub dry_bulb: f64,
    pub dew_point: f64,
    pub relative_humidity: f64,
    pub wind_speed: f64,
}

/// An EPW weather file held in memory. Raw lines, including their line
/// terminators, are kept so that unmodified content is written back
/// byte for byte.
#[derive(Clone, Debug)]
pub struct EpwFile {
    raw_lines: Vec<String>,
    record_lines: Vec<usize>,
    records: Vec<EpwRecord>,
    location: EpwLocation,
    ground_temperatures: Vec<GroundTemperature>,
}

impl EpwFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EpwError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, EpwError> {
        let raw_lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        if raw_lines.len() < EPW_HEADER_LINES {
            return Err(EpwError::MissingHeader {
                line: raw_lines.len() + 1,
            });
        }

        let location = parse_location(strip_terminator(&raw_lines[0]))?;
        let ground_temperatures =
            parse_ground_temperatures(strip_terminator(&raw_lines[GROUND_TEMPERATURE_LINE]))?;

        let record_lines: Vec<usize> = (EPW_HEADER_LINES..raw_lines.len())
            .filter(|&i| !strip_terminator(&raw_lines[i]).trim().is_empty())
            .collect();
        let data = record_lines
            .iter()
            .map(|&i| strip_terminator(&raw_lines[i]))
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = CsvReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(data.as_bytes());

        let mut records = Vec::with_capacity(record_lines.len());
        for (i, result) in reader.records().enumerate() {
            let record = result?;
            let line = record_lines.get(i).map(|l| l + 1).unwrap_or_default();
            records.push(parse_record(&record, line)?);
        }
        if records.len() != record_lines.len() {
            return Err(EpwError::Malformed {
                line: EPW_HEADER_LINES + 1,
                reason: format!(
                    "{} data lines produced {} records",
                    record_lines.len(),
                    records.len()
                ),
            });
        }

        Ok(Self {
            raw_lines,
            record_lines,
            records,
            location,
            ground_temperatures,
        })
    }

    pub fn location(&self) -> &EpwLocation {
        &self.location
    }

    pub fn records(&self) -> &[EpwRecord] {
        &self.records
    }

    pub fn ground_temperatures(&self) -> &[GroundTemperature] {
        &self.ground_temperatures
    }

    /// Rebuild the file with `morphed` written over consecutive records
    /// starting at `first_record`. Only dry bulb, dew point, relative humidity
    /// and wind speed change; every other byte is copied from the source.
    pub fn render(&self, first_record: usize, morphed: &[MorphedRecord]) -> String {
        let mut rendered = String::with_capacity(self.raw_lines.iter().map(String::len).sum());
        let mut replacement_at = vec![None; self.raw_lines.len()];
        for (offset, values) in morphed.iter().enumerate() {
            if let Some(&line) = self.record_lines.get(first_record + offset) {
                replacement_at[line] = Some(values);
            }
        }

        for (raw, replacement) in self.raw_lines.iter().zip(replacement_at) {
            match replacement {
                None => rendered.push_str(raw),
                Some(values) => {
                    let content = strip_terminator(raw);
                    let mut fields: Vec<String> = content.split(',').map(str::to_string).collect();
                    for (column, value) in [
                        (COLUMN_AIR_TEMP, values.dry_bulb),
                        (COLUMN_DEW_POINT, values.dew_point),
                        (COLUMN_RELATIVE_HUMIDITY, values.relative_humidity),
                        (COLUMN_WIND_SPEED, values.wind_speed),
                    ] {
                        if let Some(field) = fields.get_mut(column) {
                            *field = format!("{value:.1}");
                        }
                    }
                    rendered.push_str(&fields.join(","));
                    rendered.push_str(&raw[content.len()..]);
                }
            }
        }
        rendered
    }
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn parse_location(line: &str) -> Result<EpwLocation, EpwError> {
    let fields: Vec<&str> = line.split(',').collect();
    let field = |column: usize, name: &str| -> Result<f64, EpwError> {
        fields
            .get(column)
            .and_then(|value| value.trim().parse().ok())
            .ok_or_else(|| EpwError::Malformed {
                line: 1,
                reason: format!("LOCATION header has no numeric {name} in field {column}"),
            })
    };
    Ok(EpwLocation {
        latitude: field(COLUMN_LATITUDE, "latitude")?,
        longitude: field(COLUMN_LONGITUDE, "longitude")?,
        time_zone: field(COLUMN_TIME_ZONE, "time zone")?,
    })
}

fn parse_ground_temperatures(line: &str) -> Result<Vec<GroundTemperature>, EpwError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if !fields[0].eq_ignore_ascii_case("GROUND TEMPERATURES") {
        return Ok(vec![]);
    }
    let malformed = |reason: String| EpwError::Malformed {
        line: GROUND_TEMPERATURE_LINE + 1,
        reason,
    };
    let depths: usize = match fields.get(1).filter(|f| !f.is_empty()) {
        Some(count) => count
            .parse()
            .map_err(|_| malformed(format!("'{count}' is not a number of depths")))?,
        None => 0,
    };

    let mut ground_temperatures = Vec::with_capacity(depths);
    for block in 0..depths {
        let start = 2 + block * GROUND_TEMPERATURE_BLOCK;
        let value = |offset: usize| -> Result<f64, EpwError> {
            fields
                .get(start + offset)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| malformed(format!("depth {} is incomplete", block + 1)))
        };
        let mut monthly = [0.; 12];
        for (month, temperature) in monthly.iter_mut().enumerate() {
            *temperature = value(4 + month)?;
        }
        ground_temperatures.push(GroundTemperature {
            depth: value(0)?,
            monthly,
        });
    }
    Ok(ground_temperatures)
}

fn parse_record(record: &csv::StringRecord, line: usize) -> Result<EpwRecord, EpwError> {
    let number = |column: usize| -> Result<f64, EpwError> {
        let value = record.get(column).ok_or_else(|| EpwError::Malformed {
            line,
            reason: format!("record has {} fields, field {column} is missing", record.len()),
        })?;
        value.trim().parse().map_err(|_| EpwError::Malformed {
            line,
            reason: format!("field {column} ('{value}') is not a number"),
        })
    };

    Ok(EpwRecord {
        year: number(COLUMN_YEAR)? as i32,
        month: number(COLUMN_MONTH)? as u32,
        day: number(COLUMN_DAY)? as u32,
        hour: number(COLUMN_HOUR)? as u32,
        dry_bulb: number(COLUMN_AIR_TEMP)?,
        dew_point: number(COLUMN_DEW_POINT)?,
        relative_humidity: number(COLUMN_RELATIVE_HUMIDITY)?,
        pressure: number(COLUMN_PRESSURE)?,
        horizontal_infrared: number(COLUMN_HORIZONTAL_IR)?,
        global_horizontal: number(COLUMN_GLOBAL_HORIZONTAL_RAD)?,
        direct_normal: number(COLUMN_DNI_RAD)?,
        diffuse_horizontal: number(COLUMN_DIF_RAD)?,
        wind_direction: number(COLUMN_WIND_DIRECTION)?,
        wind_speed: number(COLUMN_WIND_SPEED)?,
        // older files stop before the precipitation columns
        precipitation: match record.get(COLUMN_PRECIPITATION) {
            Some(_) => number(COLUMN_PRECIPITATION)?,
            None => 0.,
        },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    /// A small EPW covering `hours` hours from 1 January, with a GROUND
    /// TEMPERATURES header at 0.5 m and 2 m. `line_ending` lets tests mix
    /// Windows and Unix terminators.
    pub(crate) fn synthetic_epw(hours: usize, line_ending: &str) -> String {
        let mut text = String::new();
        text.push_str("LOCATION,Boston Logan Intl Arpt,MA,USA,TMY3,725090,42.37,-71.02,-5.0,6.0");
        text.push_str(line_ending);
        text.push_str("DESIGN CONDITIONS,0");
        text.push_str(line_ending);
        text.push_str("TYPICAL/EXTREME PERIODS,0");
        text.push_str(line_ending);
        text.push_str("GROUND TEMPERATURES,2,.5,,,,1.5,0.2,1.3,3.8,9.4,14.8,18.8,20.5,19.6,16.1,11.1,6.0,2.0,,,,3.8,2.6,2.8,4.1,7.8,11.9,15.5,17.8,18.3,16.6,13.5,9.5");
        text.push_str(line_ending);
        text.push_str("HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0");
        text.push_str(line_ending);
        text.push_str("COMMENTS 1,synthetic");
        text.push_str(line_ending);
        text.push_str("COMMENTS 2,synthetic");
        text.push_str(line_ending);
        text.push_str("DATA PERIODS,1,1,Data,Sunday, 1/ 1,12/31");
        text.push_str(line_ending);
        for hour in 0..hours {
            let day = hour / 24 + 1;
            text.push_str(&format!(
                "1999,1,{day},{},60,?9?9?9?9E0?9?9?9?9?9?9?9?9?9?9?9?9?9?9?9*9*9?9?9?9,-3.3,-7.2,74,101500,0,1415,280,0,0,0,0,0,0,0,270,4.6,10,10,16.1,1800,9,999999999,60,0.0530,0,88,0.000,0.0,0.0",
                hour % 24 + 1
            ));
            text.push_str(line_ending);
        }
        text
    }

    #[rstest]
    fn should_parse_header_and_records() {
        let epw = EpwFile::parse(&synthetic_epw(48, "\n")).unwrap();
        assert_eq!(
            epw.location(),
            &EpwLocation {
                latitude: 42.37,
                longitude: -71.02,
                time_zone: -5.0
            }
        );
        assert_eq!(epw.ground_temperatures().len(), 2);
        assert_eq!(epw.ground_temperatures()[0].depth, 0.5);
        assert_eq!(epw.ground_temperatures()[1].monthly[8], 18.3);

        assert_eq!(epw.records().len(), 48);
        let record = &epw.records()[25];
        assert_eq!((record.month, record.day, record.hour), (1, 2, 2));
        assert_eq!(record.dry_bulb, -3.3);
        assert_eq!(record.dew_point, -7.2);
        assert_eq!(record.pressure, 101500.);
        assert_eq!(record.horizontal_infrared, 280.);
        assert_eq!(record.wind_direction, 270.);
        assert_eq!(record.wind_speed, 4.6);
        assert_eq!(record.precipitation, 0.);
    }

    #[rstest]
    fn should_reproduce_the_source_byte_for_byte_when_nothing_is_morphed() {
        let mut text = synthetic_epw(30, "\r\n");
        // trailing blank line and a missing final terminator both survive
        text.push_str("\r\n");
        text.push_str("1999,1,2,7,60,?9?9?9?9E0?9?9?9?9?9?9?9?9?9?9?9?9?9?9?9*9*9?9?9?9,-3.3,-7.2,74,101500,0,1415,280,0,0,0,0,0,0,0,270,4.6,10,10,16.1,1800,9,999999999,60,0.0530,0,88,0.000,0.0,0.0");

        let epw = EpwFile::parse(&text).unwrap();
        assert_eq!(epw.records().len(), 31);
        assert_eq!(epw.render(0, &[]), text);
    }

    #[rstest]
    fn should_only_rewrite_morphed_fields() {
        let text = synthetic_epw(3, "\n");
        let epw = EpwFile::parse(&text).unwrap();
        let rendered = epw.render(
            1,
            &[MorphedRecord {
                dry_bulb: 1.26,
                dew_point: -4.04,
                relative_humidity: 70.56,
                wind_speed: 2.,
            }],
        );

        let source_lines: Vec<&str> = text.lines().collect();
        let rendered_lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(source_lines.len(), rendered_lines.len());
        for (i, (source, rendered)) in source_lines.iter().zip(&rendered_lines).enumerate() {
            if i != EPW_HEADER_LINES + 1 {
                assert_eq!(source, rendered);
            }
        }

        let fields: Vec<&str> = rendered_lines[EPW_HEADER_LINES + 1].split(',').collect();
        let source_fields: Vec<&str> = source_lines[EPW_HEADER_LINES + 1].split(',').collect();
        assert_eq!(fields[6], "1.3");
        assert_eq!(fields[7], "-4.0");
        assert_eq!(fields[8], "70.6");
        assert_eq!(fields[21], "2.0");
        for column in (0..fields.len()).filter(|c| ![6, 7, 8, 21].contains(c)) {
            assert_eq!(fields[column], source_fields[column]);
        }
    }

    #[rstest]
    fn should_reject_truncated_or_malformed_files() {
        assert!(matches!(
            EpwFile::parse("LOCATION,a,b,c,d,e,1,2,3\nDESIGN CONDITIONS\n"),
            Err(EpwError::MissingHeader { line: 3 })
        ));

        let text = synthetic_epw(2, "\n").replace("-3.3,-7.2", "warm,-7.2");
        assert!(matches!(
            EpwFile::parse(&text),
            Err(EpwError::Malformed { line: 9, .. })
        ));

        let text = synthetic_epw(1, "\n").replace("42.37", "north");
        assert!(matches!(
            EpwFile::parse(&text),
            Err(EpwError::Malformed { line: 1, .. })
        ));
    }
}
