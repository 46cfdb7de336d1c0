//! Backup result formatting

use crate::backup::{BackupInspection, BackupWarning, EntityCounts, ImportReport};
use crate::delivery::DeliveryReceipt;

fn format_counts(counts: &EntityCounts) -> String {
    format!(
        "{} contacts, {} notes, {} links, {} attachments",
        counts.contacts, counts.notes, counts.links, counts.attachments
    )
}

/// Format the warnings of an export or import
pub fn format_warnings(warnings: &[BackupWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut output = format!("Warnings ({}):\n", warnings.len());
    for warning in warnings {
        output.push_str(&format!("  - {}\n", warning));
    }
    output
}

pub fn format_delivery(receipt: &DeliveryReceipt, counts: &EntityCounts) -> String {
    let mut output = String::new();
    output.push_str(&format!("Backup saved: {}\n", receipt.path.display()));
    output.push_str(&format!("  Via:      {}\n", receipt.strategy));
    output.push_str(&format!("  Contents: {}\n", format_counts(counts)));
    for attempt in &receipt.failed_attempts {
        output.push_str(&format!("  Skipped {}: {}\n", attempt.strategy, attempt.error));
    }
    if receipt.shared {
        output.push_str("  Shared with the system handler\n");
    }
    if let Some(error) = &receipt.share_error {
        output.push_str(&format!("  Share failed: {}\n", error));
    }
    output
}

pub fn format_import_report(report: &ImportReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Imported {} backup{}\n",
        report.format,
        if report.encrypted { " (encrypted)" } else { "" }
    ));
    output.push_str(&format!("  Restored: {}\n", format_counts(&report.inserted)));
    if report.orphans > 0 {
        output.push_str(&format!(
            "  {} records reference a contact missing from the backup\n",
            report.orphans
        ));
    }
    let losses = report.partial_losses();
    if losses > 0 {
        output.push_str(&format!(
            "  {} images or files could not be restored; export a structured backup for a complete copy\n",
            losses
        ));
    }
    output.push_str(&format_warnings(&report.warnings));
    output
}

pub fn format_inspection(inspection: &BackupInspection) -> String {
    let mut output = String::new();
    output.push_str(&format!("Format:    {}\n", inspection.format));
    output.push_str(&format!(
        "Encrypted: {}\n",
        if inspection.encrypted { "Yes" } else { "No" }
    ));
    if let Some(exported_at) = inspection.exported_at {
        output.push_str(&format!(
            "Exported:  {}\n",
            exported_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(version) = &inspection.app_version {
        output.push_str(&format!("Version:   {}\n", version));
    }
    match &inspection.counts {
        Some(counts) => output.push_str(&format!("Contents:  {}\n", format_counts(counts))),
        None => output.push_str("Contents:  (password required to read)\n"),
    }
    output.push_str(&format_warnings(&inspection.warnings));
    output
}
