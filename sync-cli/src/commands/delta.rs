//! Delta packet tools.

use anyhow::{Context, Result};
use std::path::Path;
use sync_core::{content_hash, DeltaCodec, DeltaPacket};

/// Write a packet turning `old` into `new`.
pub async fn diff(old: &Path, new: &Path, out: &Path) -> Result<()> {
    let old_data = read(old).await?;
    let new_data = read(new).await?;

    let packet = DeltaCodec::new()
        .generate(&old_data, &new_data)
        .context("Failed to generate delta")?;
    tokio::fs::write(out, &packet)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Wrote {} byte delta to {} (new content: {} bytes)",
        packet.len(),
        out.display(),
        new_data.len()
    );
    Ok(())
}

/// Apply the packet in `packet` to `old`, writing the result to `out`.
pub async fn apply(old: &Path, packet: &Path, out: &Path, max_output: Option<u64>) -> Result<()> {
    let old_data = read(old).await?;
    let packet_data = read(packet).await?;

    let mut codec = DeltaCodec::new();
    if let Some(limit) = max_output {
        codec = codec.with_max_output(limit);
    }
    let result = codec
        .apply(&old_data, &packet_data)
        .with_context(|| format!("Failed to apply {}", packet.display()))?;
    tokio::fs::write(out, &result)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} bytes to {}", result.len(), out.display());
    Ok(())
}

/// Describe a packet without applying it.
pub async fn inspect(packet: &Path, base: Option<&Path>) -> Result<()> {
    let bytes = read(packet).await?;
    let decoded = DeltaPacket::decode(&bytes)
        .with_context(|| format!("{} is not a valid delta packet", packet.display()))?;

    println!("=== delta packet ===");
    println!();
    println!("Size:       {} bytes", bytes.len());
    println!("Base hash:  {}", String::from_utf8_lossy(&decoded.base_hash));
    println!("New size:   {} bytes", decoded.new_size);
    println!("Operations: {}", decoded.ops.len());
    for (i, op) in decoded.ops.iter().enumerate() {
        println!(
            "  [{}] type {} at offset {} ({} bytes)",
            i,
            op.op_type(),
            op.offset(),
            op.payload().len()
        );
    }

    if let Some(base) = base {
        let base_data = read(base).await?;
        let matches = content_hash(&base_data).as_bytes() == decoded.base_hash.as_slice();
        println!();
        println!(
            "Base {}: {}",
            base.display(),
            if matches { "MATCH" } else { "MISMATCH" }
        );
    }
    Ok(())
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
