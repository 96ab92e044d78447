//! Startup diagnostic dump of the device roster.
//!
//! One header line per device, followed by the indented button then axis listings:
//!
//! ```text
//! Joystick[0]:Xbox Controller
//!   buttons:2
//!    Button[name=South, role=action_bottom, id=0]
//!    Button[name=East, role=action_right, id=1]
//!   axes:1
//!    Axis[name=Left Stick X, role=x, id=0, dead_zone=0.1]
//! ```

use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::device::{Axis, Button, Device, DeviceId};

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Error writing joystick dump to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed joystick dump at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

const COUNT_INDENT: &str = "  ";
const ENTRY_INDENT: &str = "   ";

pub fn write_dump<W: Write>(devices: &[Device], out: &mut W) -> io::Result<()> {
    for device in devices {
        writeln!(out, "Joystick[{}]:{}", device.id, device.name)?;
        writeln!(out, "{}buttons:{}", COUNT_INDENT, device.buttons.len())?;
        for button in &device.buttons {
            writeln!(out, "{}{}", ENTRY_INDENT, button)?;
        }
        writeln!(out, "{}axes:{}", COUNT_INDENT, device.axes.len())?;
        for axis in &device.axes {
            writeln!(out, "{}{}", ENTRY_INDENT, axis)?;
        }
    }
    Ok(())
}

/// Writes `joysticks-<unix millis>.txt` into `directory` and returns its path
pub fn write_dump_file(devices: &[Device], directory: &Path) -> Result<PathBuf, DumpError> {
    let path = directory.join(format!("joysticks-{}.txt", Local::now().timestamp_millis()));
    let io_error = |source: io::Error| DumpError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(directory).map_err(io_error)?;
    let mut out = BufWriter::new(File::create(&path).map_err(io_error)?);
    write_dump(devices, &mut out).map_err(io_error)?;
    out.flush().map_err(io_error)?;

    info!("Joystick dump written to {}", path.display());
    Ok(path)
}

/// Parses the text produced by [`write_dump`] back into devices
pub fn parse_dump(text: &str) -> Result<Vec<Device>, DumpError> {
    let mut parser = DumpParser::default();
    for (number, line) in text.lines().enumerate() {
        parser.line(number + 1, line)?;
    }
    parser.finish(text.lines().count())
}

#[derive(Default)]
struct DumpParser {
    devices: Vec<Device>,
    current: Option<PendingDevice>,
}

struct PendingDevice {
    device: Device,
    declared_buttons: Option<usize>,
    declared_axes: Option<usize>,
}

impl DumpParser {
    fn line(&mut self, number: usize, line: &str) -> Result<(), DumpError> {
        let parse_error = |reason: String| DumpError::Parse {
            line: number,
            reason,
        };
        if line.trim().is_empty() {
            return Ok(());
        }

        // Only the fixed indentation is stripped; names keep their own whitespace
        if let Some(header) = line.strip_prefix("Joystick[") {
            self.flush(number)?;
            let (id, name) = header
                .split_once("]:")
                .ok_or_else(|| parse_error("header without ']:'".to_string()))?;
            let id = id
                .parse::<usize>()
                .map_err(|e| parse_error(format!("bad device id '{}': {}", id, e)))?;
            debug!("Parsing dump entry for device {}", id);
            self.current = Some(PendingDevice {
                device: Device::new(DeviceId(id), name),
                declared_buttons: None,
                declared_axes: None,
            });
            return Ok(());
        }

        let pending = self
            .current
            .as_mut()
            .ok_or_else(|| parse_error("entry before any Joystick header".to_string()))?;

        if let Some(entry) = line.strip_prefix(ENTRY_INDENT) {
            if entry.starts_with("Button[") {
                let button = parse_button(entry).map_err(parse_error)?;
                pending.device.buttons.push(button);
            } else if entry.starts_with("Axis[") {
                let axis = parse_axis(entry).map_err(parse_error)?;
                pending.device.axes.push(axis);
            } else {
                return Err(parse_error(format!("unexpected entry '{}'", entry)));
            }
        } else if let Some(section) = line.strip_prefix(COUNT_INDENT) {
            if let Some(count) = section.strip_prefix("buttons:") {
                pending.declared_buttons = Some(parse_count(count).map_err(parse_error)?);
            } else if let Some(count) = section.strip_prefix("axes:") {
                pending.declared_axes = Some(parse_count(count).map_err(parse_error)?);
            } else {
                return Err(parse_error(format!("unexpected line '{}'", line)));
            }
        } else {
            return Err(parse_error(format!("unexpected line '{}'", line)));
        }
        Ok(())
    }

    // Checks the declared counts of the device being parsed and stores it
    fn flush(&mut self, number: usize) -> Result<(), DumpError> {
        let Some(pending) = self.current.take() else {
            return Ok(());
        };
        let device = pending.device;
        let check = |what: &str, declared: Option<usize>, found: usize| match declared {
            Some(declared) if declared == found => Ok(()),
            Some(declared) => Err(DumpError::Parse {
                line: number,
                reason: format!(
                    "device {} declares {} {} but lists {}",
                    device.id, declared, what, found
                ),
            }),
            None => Err(DumpError::Parse {
                line: number,
                reason: format!("device {} has no {} count", device.id, what),
            }),
        };
        check("buttons", pending.declared_buttons, device.buttons.len())?;
        check("axes", pending.declared_axes, device.axes.len())?;
        self.devices.push(device);
        Ok(())
    }

    fn finish(mut self, last_line: usize) -> Result<Vec<Device>, DumpError> {
        self.flush(last_line)?;
        Ok(self.devices)
    }
}

fn parse_count(text: &str) -> Result<usize, String> {
    text.trim()
        .parse()
        .map_err(|e| format!("bad count '{}': {}", text, e))
}

// Splits "Kind[name=.., k=v, ...]" from the right so names may contain ", "
fn fields<'a>(line: &'a str, kind: &str, count: usize) -> Result<Vec<&'a str>, String> {
    let body = line
        .strip_prefix(kind)
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| format!("malformed {} entry '{}'", kind, line))?;
    let mut parts: Vec<&str> = body.rsplitn(count, ", ").collect();
    if parts.len() != count {
        return Err(format!("{} entry '{}' needs {} fields", kind, line, count));
    }
    parts.reverse();
    Ok(parts)
}

fn field<'a>(part: &'a str, key: &str) -> Result<&'a str, String> {
    part.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| format!("expected '{}=' in '{}'", key, part))
}

fn parse_button(line: &str) -> Result<Button, String> {
    let parts = fields(line, "Button", 3)?;
    Ok(Button {
        name: field(parts[0], "name")?.to_string(),
        role: field(parts[1], "role")?.parse()?,
        index: field(parts[2], "id")?
            .parse()
            .map_err(|e| format!("bad button id: {}", e))?,
    })
}

fn parse_axis(line: &str) -> Result<Axis, String> {
    let parts = fields(line, "Axis", 4)?;
    Ok(Axis {
        name: field(parts[0], "name")?.to_string(),
        role: field(parts[1], "role")?.parse()?,
        index: field(parts[2], "id")?
            .parse()
            .map_err(|e| format!("bad axis id: {}", e))?,
        dead_zone: field(parts[3], "dead_zone")?
            .parse()
            .map_err(|e| format!("bad dead zone: {}", e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::device::{AxisRole, ButtonRole};

    fn roster() -> Vec<Device> {
        vec![
            Device::new(DeviceId(0), "Pad, Wireless")
                .with_button("South", ButtonRole::ActionBottom)
                .with_button("DPad Left", ButtonRole::DPadLeft)
                .with_axis("Left Stick X", AxisRole::X, 0.1)
                .with_axis("DPad X", AxisRole::PovX, 0.0),
            Device::new(DeviceId(3), "Stick").with_axis("Throttle", AxisRole::Unmapped, 0.25),
        ]
    }

    fn dump_text(devices: &[Device]) -> String {
        let mut out = Vec::new();
        write_dump(devices, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn dump_lists_header_buttons_then_axes() {
        let text = dump_text(&roster()[..1]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Joystick[0]:Pad, Wireless");
        assert_eq!(lines[1], "  buttons:2");
        assert_eq!(lines[2], "   Button[name=South, role=action_bottom, id=0]");
        assert_eq!(lines[3], "   Button[name=DPad Left, role=dpad_left, id=1]");
        assert_eq!(lines[4], "  axes:2");
        assert_eq!(lines[5], "   Axis[name=Left Stick X, role=x, id=0, dead_zone=0.1]");
    }

    #[test]
    fn parse_recovers_written_roster() {
        let devices = roster();
        let parsed = parse_dump(&dump_text(&devices)).unwrap();
        assert_eq!(parsed, devices);
    }

    #[test]
    fn names_keep_surrounding_whitespace() {
        let devices = vec![Device::new(DeviceId(2), "  USB Gamepad  ")
            .with_button(" Trigger ", ButtonRole::Other(20))
            .with_axis("X ", AxisRole::X, 0.0)];
        let parsed = parse_dump(&dump_text(&devices)).unwrap();
        assert_eq!(parsed, devices);
        assert_eq!(parsed[0].name, "  USB Gamepad  ");
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let text = "Joystick[1]:Pad\n  buttons:2\n   Button[name=A, role=action_bottom, id=0]\n  axes:0\n";
        assert!(matches!(parse_dump(text), Err(DumpError::Parse { .. })));
    }

    #[test]
    fn entries_without_header_are_rejected() {
        let text = "   Axis[name=X, role=x, id=0, dead_zone=0]\n";
        assert!(matches!(parse_dump(text), Err(DumpError::Parse { line: 1, .. })));
    }

    #[test]
    fn dump_file_lands_in_directory() {
        let dir = std::env::temp_dir().join(format!("joyscope-dump-{}", std::process::id()));
        let path = write_dump_file(&roster(), &dir).unwrap();
        assert!(path.starts_with(&dir));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(parse_dump(&text).unwrap().len(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
