fn main() -> anyhow::Result<()> {
    // esp-idf-sys only exports the ESP-IDF environment when building for the chip
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    Ok(())
}
