//! CLI tool for NetStatWiz (netstatwiz)

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "netstatwiz")]
#[command(about = "NetStatWiz: map active external connections and summarize ports, services and countries", long_about = None)]
#[command(version)]
struct Cli {}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use netstatwiz::{Config, NetStatWiz};

    let _cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::load_or_default();
    let top_n = config.output.top_n;

    println!("{}", "=".repeat(60));
    println!("NetStatWiz - Network Statistics Wizard");
    println!("{}", "=".repeat(60));

    let mut wiz = NetStatWiz::from_config(config)?;

    println!("Running netstat...");
    println!("Parsing connections...");
    let found = wiz.collect().len();
    println!("Found {} external connections", found);

    if found == 0 {
        println!("No external connections found.");
        println!("No connections to analyze.");
        return Ok(());
    }

    println!("\nGetting IP geolocation data (this may take a while)...");
    println!("Found {} unique IP addresses", wiz.unique_ips().len());
    wiz.resolve_all(|i, total, ip| println!("Processing IP {}/{}: {}", i, total, ip));

    let aggregates = wiz.aggregates();
    print_summary(&aggregates, top_n);

    println!("\nGenerating map...");
    let map = wiz.write_map();
    print_map_report(&map);

    println!("\nGenerating tables...");
    let tables = wiz.write_tables(&aggregates);
    println!("  {} {}", status_mark(&tables), tables);

    println!("\n{}", "=".repeat(60));
    println!("Analysis complete!");
    println!("{}", "=".repeat(60));
    println!("Files generated:");
    println!("  - {} (interactive map)", wiz.config().output.map_file.display());
    println!("  - {} (detailed tables)", wiz.config().output.tables_file.display());

    Ok(())
}

#[cfg(feature = "cli")]
fn print_summary(aggregates: &netstatwiz::Aggregates, top_n: usize) {
    println!("\n{}", "=".repeat(60));
    println!("NETWORK ANALYSIS SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total Connections: {}", aggregates.total_connections);
    println!("Unique IP Addresses: {}", aggregates.unique_ips);
    println!("Unique Ports: {}", aggregates.unique_ports());

    println!("\nTop Ports by Connection Count:");
    for row in aggregates.top_ports(top_n) {
        println!("  Port {} ({}): {} connections", row.port, row.service, row.count);
    }

    println!("\nTop Countries by Connection Count:");
    for (country, count) in aggregates.top_countries(top_n) {
        println!("  {}: {} connections", country, count);
    }
}

#[cfg(feature = "cli")]
fn print_map_report(map: &netstatwiz::MapReport) {
    println!("  {} Map {}", status_mark(&map.outcome), map.outcome);
    if map.outcome.is_primary() {
        if map.markers == 0 {
            println!("  Warning: No valid location coordinates found. Map will be empty.");
        }
        println!(
            "  Markers added: {} out of {} IP locations",
            map.markers, map.locations
        );
    }
}

#[cfg(feature = "cli")]
fn status_mark(outcome: &netstatwiz::EmitOutcome) -> &'static str {
    match outcome {
        netstatwiz::EmitOutcome::Primary { .. } => "✓",
        netstatwiz::EmitOutcome::Fallback { .. } => "⚠",
        netstatwiz::EmitOutcome::Failed { .. } => "✗",
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
