fn main() -> anyhow::Result<()> {
    fastnote::ui::io::run()?;
    Ok(())
}
