//! roi_check - evaluate bounding boxes against a restricted region
//!
//! Scales a normalized ROI to the given frame size and reports, per box, whether it
//! overlaps the region and which overlap condition decided it. Exits with status 2
//! when any box intersects, so the tool can gate shell pipelines.

use anyhow::{anyhow, Result};
use clap::Parser;

use roi_sentinel::config::parse_roi;
use roi_sentinel::{evaluate_frame, BoundingBox, DetectedObject, Roi, PERSON_LABEL};

#[derive(Parser, Debug)]
#[command(
    name = "roi_check",
    about = "Check person boxes against a normalized restricted region"
)]
struct Args {
    /// Normalized ROI vertices, e.g. "0.2,0.2 0.8,0.2 0.8,0.8 0.2,0.8" (default: centered 60%)
    #[arg(long, value_name = "VERTICES")]
    roi: Option<String>,

    /// Frame size in pixels, WIDTHxHEIGHT
    #[arg(long, default_value = "640x480", value_name = "WxH")]
    frame: String,

    /// Box in pixels as x,y,width,height (repeatable)
    #[arg(long = "box", value_name = "X,Y,W,H", required = true)]
    boxes: Vec<String>,

    /// Emit the evaluation as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let roi = match args.roi.as_deref() {
        Some(value) => parse_roi(value)?,
        None => Roi::default(),
    };
    let (width, height) = parse_frame_size(&args.frame)?;
    let objects = args
        .boxes
        .iter()
        .map(|b| parse_box(b).map(DetectedObject::person))
        .collect::<Result<Vec<_>>>()?;

    let eval = evaluate_frame(&roi, 0, width, height, &objects, PERSON_LABEL);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
    } else {
        println!("roi_check: frame {}x{}, {} box(es)", width, height, objects.len());
        for c in &eval.classifications {
            let b = &c.object.bbox;
            let verdict = match c.path {
                Some(path) => format!("INTERSECTS ({:?})", path),
                None => "clear".to_string(),
            };
            println!(
                "  box {},{},{},{}: {}",
                b.x, b.y, b.width, b.height, verdict
            );
        }
        println!(
            "result: {}",
            if eval.intrusion { "INTRUSION" } else { "SECURE" }
        );
    }

    if eval.intrusion {
        std::process::exit(2);
    }
    Ok(())
}

fn parse_frame_size(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("frame size '{}' must be WIDTHxHEIGHT", value))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid frame width '{}'", w))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid frame height '{}'", h))?;
    Ok((width, height))
}

fn parse_box(value: &str) -> Result<BoundingBox> {
    let parts = value
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("box '{}' has a non-numeric field '{}'", value, p))
        })
        .collect::<Result<Vec<_>>>()?;
    let [x, y, width, height] = parts[..] else {
        return Err(anyhow!("box '{}' must be x,y,width,height", value));
    };
    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(anyhow!("box '{}' has a non-finite field", value));
    }
    if width < 0.0 || height < 0.0 {
        return Err(anyhow!("box '{}' has a negative extent", value));
    }
    Ok(BoundingBox::new(x, y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_box_accepts_line_boxes() {
        let bbox = parse_box("50, 0, 0, 100").unwrap();
        assert_eq!(bbox, BoundingBox::new(50.0, 0.0, 0.0, 100.0));
    }

    #[test]
    fn parse_box_rejects_bad_input() {
        assert!(parse_box("1,2,3").is_err());
        assert!(parse_box("1,2,3,4,5").is_err());
        assert!(parse_box("1,2,-3,4").is_err());
        assert!(parse_box("1,2,NaN,4").is_err());
        assert!(parse_box("NaN,2,3,4").is_err());
        assert!(parse_box("1,2,inf,4").is_err());
        assert!(parse_box("a,2,3,4").is_err());
    }

    #[test]
    fn parse_frame_size_reads_both_separators() {
        assert_eq!(parse_frame_size("640x480").unwrap(), (640, 480));
        assert_eq!(parse_frame_size("1920X1080").unwrap(), (1920, 1080));
        assert!(parse_frame_size("640").is_err());
    }
}
