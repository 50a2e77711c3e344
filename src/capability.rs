use crate::config::ComputeMode;
use crate::gpu::Gpu;

#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub requested: ComputeMode,
    /// Whether compute simulations will run.
    pub compute: bool,
    notes: Vec<String>,
}

impl CapabilityReport {
    pub fn changed(&self) -> bool {
        self.requested == ComputeMode::Enabled && !self.compute
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn record_compute_fallback(&mut self, reason: impl Into<String>) {
        self.compute = false;
        self.notes.push(reason.into());
    }

    pub fn status_label(&self) -> String {
        if self.changed() {
            return "fallback compute on->off".to_string();
        }
        format!(
            "ok compute={}",
            if self.compute { "on" } else { "off" }
        )
    }
}

pub fn probe_gpu(gpu: &dyn Gpu, requested: ComputeMode) -> CapabilityReport {
    let mut report = CapabilityReport {
        requested,
        compute: false,
        notes: Vec::new(),
    };
    let supported = gpu.supports_compute();

    match requested {
        ComputeMode::Disabled => {
            report.push_note("compute simulations disabled by --compute=disabled");
        }
        ComputeMode::Auto | ComputeMode::Enabled if supported => {
            report.compute = true;
        }
        ComputeMode::Auto => {
            report.push_note("compute shaders unavailable; simulations disabled");
        }
        ComputeMode::Enabled => {
            report.record_compute_fallback(
                "compute requested but unsupported by this device; simulations disabled",
            );
        }
    }

    if report.notes.is_empty() {
        report.push_note("probe selected requested compute mode with no fallback");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::software::SoftwareGpu;

    #[test]
    fn missing_compute_is_recorded_as_fallback() {
        let mut gpu = SoftwareGpu::new();
        gpu.set_compute_supported(false);
        let report = probe_gpu(&gpu, ComputeMode::Enabled);
        assert!(!report.compute);
        assert!(report.changed());
        assert!(!report.notes().is_empty());

        let auto = probe_gpu(&SoftwareGpu::new(), ComputeMode::Auto);
        assert!(auto.compute);
        assert!(!auto.changed());
    }
}
