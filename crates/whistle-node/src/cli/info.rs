use super::utils::print_header;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn show_version() {
    print_header("Build Information");
    println!("  Version:   \x1b[38;5;51m{}\x1b[0m", BUILD_VERSION);
    println!(
        "  Profile:   \x1b[38;5;245m{}\x1b[0m",
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );
    println!();
    print_header("Components");
    println!("  Chain:     \x1b[38;5;51methers\x1b[0m (JSON-RPC, BIP-39 role wallets)");
    println!("  ZK:        \x1b[38;5;51mGroth16 + MiMC sponge\x1b[0m (BN254 curve)");
    println!("  Compiler:  \x1b[38;5;51msolc\x1b[0m (external)");
    println!();
    println!("\x1b[38;5;245mLicense:     AGPL-3.0\x1b[0m");
}
