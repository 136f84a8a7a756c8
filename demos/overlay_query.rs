//! Example: query a main tree plus an overlay through the package-set API.
//!
//! Models a small slice of the Gentoo tree in two repositories — the main
//! `gentoo` tree plus a higher-priority `local` overlay that shadows some
//! of its packages — and walks through the query surface: atom matching,
//! lazy filter chains, best-version selection with overlay priority, strict
//! lookup, and category disambiguation for partial atoms.

use pkgset::{Atom, Error, Filter, MemoryPm, MetadataKey, PackageManager, PackageSet, PmConfig};

const CONFIG: &str = r#"
[[repos]]
name = "gentoo"
location = "/var/db/repos/gentoo"
priority = -1000

[[repos.packages]]
cpv = "sys-libs/zlib-1.2.13"

[[repos.packages]]
cpv = "sys-libs/zlib-1.3.1"

[[repos.packages]]
cpv = "dev-lang/python-3.11.9"
slot = "3.11"

[[repos.packages]]
cpv = "dev-lang/python-3.12.4"
slot = "3.12"

[[repos.packages]]
cpv = "net-misc/curl-8.7.1"
[repos.packages.metadata]
DESCRIPTION = "A Client that groks URLs"

[[repos.packages]]
cpv = "app-misc/screen-4.9.1"

[[repos]]
name = "local"
location = "/var/db/repos/local"
priority = 0

[[repos.packages]]
cpv = "dev-lang/python-3.12.4"
slot = "3.12"

[[repos.packages]]
cpv = "net-misc/curl-8.8.0"
[repos.packages.metadata]
DESCRIPTION = "A Client that groks URLs"

[[repos.packages]]
cpv = "dev-util/screen-grab-1.0"
"#;

/// Print every package a query yields, in deterministic order.
fn dump(set: &impl PackageSet) -> Result<(), Error> {
    let sorted = set.sorted();
    for pkg in sorted.iter() {
        let pkg = pkg?;
        match pkg.metadata(&MetadataKey::Slot)? {
            Some(slot) => println!("    {pkg:<38} :{slot}"),
            None => println!("    {pkg}"),
        }
    }
    Ok(())
}

fn banner(title: &str) {
    println!("\n{}\n{title}\n{}", "=".repeat(60), "=".repeat(60));
}

fn main() -> Result<(), Error> {
    let pm = MemoryPm::from_config(PmConfig::from_toml(CONFIG)?)?;
    let repos = pm.repositories();

    println!("Package manager: {}", pm.name());
    println!("Repositories (highest priority first):");
    for repo in repos.iter_repos() {
        println!(
            "    {:<8} priority {:>5}  {}",
            repo.name(),
            repo.priority(),
            repo.path().display()
        );
    }

    // ── Full atom query across both trees ───────────────────────────
    banner(">=dev-lang/python-3.12");
    let atom = Atom::parse(">=dev-lang/python-3.12")?;
    dump(&repos.query(&atom))?;
    let best = repos.query(&atom).best()?;
    println!("  best: {best}  (overlay wins the version tie)");

    // ── Repository-pinned atom ──────────────────────────────────────
    banner("dev-lang/python::gentoo");
    dump(&repos.query(&Atom::parse("dev-lang/python::gentoo")?))?;

    // ── Lazy filter chain with a metadata constraint ────────────────
    banner("filter: net-misc/* with a DESCRIPTION match");
    let curls = repos.filter(
        Filter::new()
            .atom(Atom::parse("net-misc/curl")?)
            .meta(MetadataKey::Description, "A Client that groks URLs"),
    );
    dump(&curls)?;
    println!("  best: {}", curls.best()?);

    // ── Partial atom spanning categories ────────────────────────────
    // `screen` matches app-misc/screen in gentoo; the overlay only has
    // dev-util/screen-grab, which the name does not match.
    banner("partial atom: screen");
    dump(&repos.query(&Atom::parse("screen")?))?;

    // ── Strict lookup ───────────────────────────────────────────────
    banner("lookup: =sys-libs/zlib-1.3.1");
    let found = repos.lookup(Atom::parse("=sys-libs/zlib-1.3.1")?)?;
    println!("    {found}");

    match repos.lookup(Atom::parse("sys-libs/zlib")?) {
        Err(Error::AmbiguousSet(msg)) => {
            println!("  lookup sys-libs/zlib: {msg}");
        }
        other => println!("  unexpected: {other:?}"),
    }

    // ── Emptiness and membership ────────────────────────────────────
    banner("membership");
    for spec in ["app-misc/screen", "app-misc/byobu", "dev-util/screen-grab"] {
        let hit = repos.contains(Atom::parse(spec)?)?;
        println!("    {spec:<22} -> {hit}");
    }

    Ok(())
}
