use crate::modulation::{LfoConfig, LfoWaveform, ModCurve, ModRoute, ModSource, NUM_LFOS};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "feedback_synth",
    version,
    about = "Audio-reactive feedback synthesizer rendered headless on the software GPU"
)]
pub struct Config {
    #[arg(long, default_value_t = 320)]
    pub width: u32,

    #[arg(long, default_value_t = 180)]
    pub height: u32,

    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Preset JSON to start from.
    #[arg(long)]
    pub preset: Option<String>,

    /// Where to write the final state as a preset.
    #[arg(long)]
    pub save_preset: Option<String>,

    /// Effect or simulation ids to enable, e.g. `plasma,kaleidoscope,physarum`.
    #[arg(long, value_delimiter = ',')]
    pub enable: Vec<String>,

    /// `param=source[:amount[:curve]]`, e.g. `muons.brightness=band2:1:easeIn`.
    #[arg(long = "route", value_parser = parse_route)]
    pub routes: Vec<ModRoute>,

    /// `slot:rate[:waveform]` with slot 1..=8, e.g. `1:0.25:triangle`.
    #[arg(long = "lfo", value_parser = parse_lfo)]
    pub lfos: Vec<(usize, LfoConfig)>,

    #[arg(long, value_enum, default_value_t = ComputeMode::Auto)]
    pub compute: ComputeMode,

    /// Sweep range of the synthetic input in Hz.
    #[arg(long, default_value_t = 40.0)]
    pub sweep_start: f32,

    #[arg(long, default_value_t = 8000.0)]
    pub sweep_end: f32,

    /// Lissajous dots drawn into the accumulator each frame; 0 disables them.
    #[arg(long, default_value_t = 3)]
    pub orbit_dots: u32,

    /// Logs every pass of the last frame.
    #[arg(long, default_value_t = false)]
    pub trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComputeMode {
    /// Use compute simulations when the device supports them.
    Auto,
    #[value(alias = "on", alias = "force")]
    Enabled,
    #[value(alias = "off", alias = "none")]
    Disabled,
}

pub fn parse_route(raw: &str) -> Result<ModRoute, String> {
    let (param, rest) = raw
        .split_once('=')
        .ok_or_else(|| "expected <param>=<source>[:amount[:curve]]".to_string())?;
    let param = param.trim();
    if !param.contains('.') {
        return Err(format!("param id '{param}' must be <group>.<field>"));
    }
    let mut parts = rest.split(':');
    let source_raw = parts.next().unwrap_or_default().trim();
    let source =
        ModSource::parse(source_raw).ok_or_else(|| format!("unknown source '{source_raw}'"))?;
    let amount = match parts.next() {
        Some(a) => a
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("invalid amount '{a}'"))?,
        None => 1.0,
    };
    let curve = match parts.next() {
        Some(c) => ModCurve::parse(c.trim()).ok_or_else(|| format!("unknown curve '{c}'"))?,
        None => ModCurve::Linear,
    };
    Ok(ModRoute::new(param, source, amount).with_curve(curve))
}

pub fn parse_lfo(raw: &str) -> Result<(usize, LfoConfig), String> {
    let mut parts = raw.split(':');
    let slot = parts
        .next()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|s| (1..=NUM_LFOS).contains(s))
        .ok_or_else(|| format!("lfo slot must be 1..={NUM_LFOS}"))?;
    let rate = match parts.next() {
        Some(r) => r
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("invalid lfo rate '{r}'"))?,
        None => LfoConfig::default().rate,
    };
    let waveform = match parts.next().map(|w| w.trim().to_ascii_lowercase()) {
        None => LfoWaveform::Sine,
        Some(w) => match w.as_str() {
            "sine" | "sin" => LfoWaveform::Sine,
            "triangle" | "tri" => LfoWaveform::Triangle,
            "sawtooth" | "saw" => LfoWaveform::Sawtooth,
            "square" | "sq" => LfoWaveform::Square,
            "hold" | "sample-hold" | "sh" => LfoWaveform::SampleHold,
            "smooth" | "smooth-random" => LfoWaveform::SmoothRandom,
            other => return Err(format!("unknown waveform '{other}'")),
        },
    };
    Ok((
        slot - 1,
        LfoConfig {
            enabled: true,
            rate,
            waveform,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_flag_parses_all_parts() {
        let r = parse_route("muons.brightness=band2:0.5:easeIn").expect("route should parse");
        assert_eq!(r.param_id, "muons.brightness");
        assert_eq!(r.source, ModSource::Band2);
        assert_eq!(r.amount, 0.5);
        assert_eq!(r.curve, ModCurve::EaseIn);
        assert!(parse_route("brightness=band2").is_err());
    }

    #[test]
    fn lfo_flag_is_one_based() {
        let (slot, cfg) = parse_lfo("3:0.5:saw").expect("lfo should parse");
        assert_eq!(slot, 2);
        assert!(cfg.enabled);
        assert_eq!(cfg.waveform, LfoWaveform::Sawtooth);
        assert!(parse_lfo("0:1").is_err());
        assert!(parse_lfo("9:1").is_err());
    }
}
