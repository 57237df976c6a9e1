//! Pixel format negotiation and output link propagation.

use std::collections::HashMap;

use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_frame_model::{LinkProps, PixelFormat, StreamRole};

/// Allocate a format list, reporting allocation failure instead of aborting.
fn make_format_list(formats: &[PixelFormat]) -> TmblockResult<Vec<PixelFormat>> {
    let mut list = Vec::new();
    list.try_reserve_exact(formats.len()).map_err(|e| {
        TmblockError::resource_exhausted(format!("cannot allocate format list: {e}"))
    })?;
    list.extend_from_slice(formats);
    Ok(list)
}

/// Proposes one pixel format per endpoint and records what each endpoint
/// accepted.
#[derive(Debug, Default)]
pub struct FormatNegotiator {
    proposals: HashMap<StreamRole, Vec<PixelFormat>>,
    accepted: HashMap<StreamRole, PixelFormat>,
}

impl FormatNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Propose RGB24 for primary and output, RGBA for logo. Runs once.
    pub fn query_formats(&mut self) -> TmblockResult<()> {
        if !self.proposals.is_empty() {
            return Err(TmblockError::invalid_state(
                "formats already proposed; renegotiation is not supported",
            ));
        }

        let mut proposals = HashMap::with_capacity(StreamRole::ALL.len());
        for role in StreamRole::ALL {
            proposals.insert(role, make_format_list(&[role.required_format()])?);
        }
        self.proposals = proposals;

        tracing::debug!(
            primary = %PixelFormat::Rgb24,
            logo = %PixelFormat::Rgba,
            output = %PixelFormat::Rgb24,
            "Proposed endpoint formats"
        );
        Ok(())
    }

    /// Formats proposed for `role`, once [`query_formats`](Self::query_formats) ran.
    pub fn proposed(&self, role: StreamRole) -> Option<&[PixelFormat]> {
        self.proposals.get(&role).map(Vec::as_slice)
    }

    /// Settle `role` on the first format in `offered` that was also proposed.
    ///
    /// For inputs, `offered` is what the upstream can produce; for the output
    /// it is what the downstream accepts.
    pub fn negotiate(
        &mut self,
        role: StreamRole,
        offered: &[PixelFormat],
    ) -> TmblockResult<PixelFormat> {
        let proposed = self.proposals.get(&role).ok_or_else(|| {
            TmblockError::invalid_state("negotiate called before query_formats")
        })?;

        let Some(format) = offered.iter().copied().find(|f| proposed.contains(f)) else {
            let offered = offered
                .iter()
                .map(|f| f.name())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TmblockError::format_rejected(
                role.name(),
                format!(
                    "offered [{offered}] but only {} is accepted",
                    role.required_format()
                ),
            ));
        };

        self.accepted.insert(role, format);
        tracing::debug!(endpoint = %role, %format, "Endpoint format accepted");
        Ok(format)
    }

    pub fn accepted(&self, role: StreamRole) -> Option<PixelFormat> {
        self.accepted.get(&role).copied()
    }

    /// True once all three endpoints accepted their format.
    pub fn is_complete(&self) -> bool {
        StreamRole::ALL
            .iter()
            .all(|role| self.accepted.contains_key(role))
    }
}

/// Derive the output link from the primary input link. The logo link never
/// influences output geometry or timing.
pub fn config_output(primary: &LinkProps) -> LinkProps {
    LinkProps {
        format: StreamRole::Output.required_format(),
        width: primary.width,
        height: primary.height,
        time_base: primary.time_base,
        sample_aspect_ratio: primary.sample_aspect_ratio,
        frame_rate: primary.frame_rate,
    }
}
