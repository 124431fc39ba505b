// tests/extract_fixtures.rs
//
// Extractor against realistic portfolio markup, including the built-in overrides.

use std::collections::HashSet;

use portfolio_scout::config::WatchConfig;
use portfolio_scout::extract::{Extractor, MAX_NAMES_PER_SOURCE};

const GRID_PAGE: &str = r#"
<!doctype html>
<html>
<head><title>Portfolio | Example Ventures</title></head>
<body>
  <header>
    <nav>
      <ul>
        <li><a href="/">Home</a></li>
        <li><a href="/portfolio">Portfolio</a></li>
        <li><a href="/team">Team</a></li>
        <li><a href="/contact">Contact Us</a></li>
      </ul>
    </nav>
  </header>
  <main>
    <h1>Our Portfolio</h1>
    <section class="portfolio-grid">
      <article class="portfolio-item">
        <h3 class="company-name">Celestia</h3>
        <p>Modular data availability network</p>
        <a href="/portfolio/celestia">Celestia</a>
      </article>
      <article class="portfolio-item">
        <h3 class="company-name">Berachain</h3>
        <a href="/portfolio/berachain">Read more</a>
      </article>
      <article class="portfolio-item">
        <h3 class="company-name">   Monad
              Labs </h3>
      </article>
      <article class="portfolio-item">
        <span class="project-name">Ethena</span>
        <span class="tag">DeFi</span>
      </article>
    </section>
    <ul class="filters">
      <li>All</li><li>Seed</li><li>Series A</li><li>Infrastructure</li>
    </ul>
  </main>
  <footer>
    <span>© 2024 Example Ventures. All rights reserved.</span>
    <a href="https://twitter.com/example">@example</a>
    <span>2024</span>
  </footer>
</body>
</html>
"#;

#[test]
fn grid_page_yields_company_names_only() {
    let ex = Extractor::default();
    let names = ex.extract(GRID_PAGE, "https://example.vc/portfolio");

    for expected in ["Celestia", "Berachain", "Monad Labs", "Ethena", "Seed", "Series A"] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}: {names:?}");
    }
    for noise in ["Home", "Portfolio", "Team", "Contact Us", "All", "Read more", "2024", "DeFi"] {
        assert!(!names.iter().any(|n| n == noise), "noise {noise} kept: {names:?}");
    }

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len(), "duplicates in {names:?}");
    // headings are discovered before project-name spans
    assert!(names.iter().position(|n| n == "Celestia") < names.iter().position(|n| n == "Ethena"));
}

#[test]
fn large_listing_is_capped_and_unique() {
    let mut html = String::from("<html><body>");
    for i in 0..180 {
        // each name appears in a heading and again in a list
        html.push_str(&format!("<h4>Venture{i}</h4><ul><li>Venture{i}</li></ul>"));
    }
    html.push_str("</body></html>");

    let names = Extractor::default().extract(&html, "https://big.vc/");
    assert_eq!(names.len(), MAX_NAMES_PER_SOURCE);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn built_in_overrides_apply_per_domain() {
    let cfg = WatchConfig::default();
    let ex = Extractor::new(cfg.registry());
    let html = r#"
        <div class="portfolio-card"><h3>Flashbots</h3></div>
        <div class="portfolio-card"><h3>Wallet Connect</h3></div>
        <div class="portfolio-card"><h3>Optimism</h3></div>
    "#;

    let paradigm = ex.extract(html, "https://www.paradigm.xyz/portfolio");
    assert_eq!(paradigm, vec!["Flashbots", "Optimism"]);

    let elsewhere = ex.extract(html, "https://www.haun.co/portfolio");
    assert_eq!(elsewhere, vec!["Flashbots", "Wallet Connect", "Optimism"]);
}
