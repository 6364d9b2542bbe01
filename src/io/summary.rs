use anyhow::Result;

use crate::ctx::Ctx;

pub fn format_summary(ctx: &Ctx) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    let dose = ctx.dose()?;
    let kind = dose.histogram_kind();
    let unit = ctx.registry.unit_label();

    let mut out = String::new();
    out.push_str(&format!("kira-dvh v{}\n", version));
    out.push_str(&format!(
        "Dose: {} ({}x{}x{}), {}\n",
        dose.id,
        dose.geometry.dims[0],
        dose.geometry.dims[1],
        dose.geometry.dims[2],
        kind.title()
    ));
    out.push_str(&format!(
        "Structures: {} computed, {} failed\n",
        ctx.registry.len(),
        ctx.failures.len()
    ));

    for curve in ctx.registry.curves() {
        out.push_str(&format!(
            "  {}: {:.3} cc, mean {:.3} {}, min {:.3}, max {:.3}\n",
            curve.structure_name(),
            curve.total_volume_cc,
            curve.mean_dose,
            unit,
            curve.min_dose,
            curve.max_dose
        ));
    }

    if ctx.failures.is_empty() {
        out.push_str("Failures: none\n");
    } else {
        out.push_str("Failures:\n");
        for failure in &ctx.failures {
            out.push_str(&format!(
                "  {} ({}): {}\n",
                failure.structure,
                failure.error.kind(),
                failure.error
            ));
        }
    }

    Ok(out)
}
