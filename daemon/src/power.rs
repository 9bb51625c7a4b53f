use anyhow::{Result, bail};
use log::info;
use tokio::process::Command;

pub async fn power_off() -> Result<()> {
    info!("powering off");
    let out = Command::new("systemctl").arg("poweroff").output().await?;
    if !out.status.success() {
        bail!(
            "systemctl poweroff failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
    }
    Ok(())
}
