//! # Quire CLI
//!
//! Usage:
//!   quire input.json -o pages.json
//!   echo '{ ... }' | quire > pages.json
//!   quire --example > report.json
//!
//! Set `RUST_LOG=debug` to follow the pagination passes.

use quire::QuireError;
use std::env;
use std::fs;
use std::io::{self, Read};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_report_json());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), QuireError> {
    let input = match args.get(1) {
        Some(path) if !path.starts_with('-') => fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let output_path = args.windows(2).find(|w| w[0] == "-o").map(|w| w[1].clone());

    let pagination = quire::paginate_json(&input)?;
    let json = serde_json::to_string_pretty(&pagination)?;
    match &output_path {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!(
                "✓ Laid out {} pages in {} passes to {}",
                pagination.pages.len(),
                pagination.stats.loops,
                path
            );
        }
        None => println!("{}", json),
    }
    if !pagination.stats.converged {
        eprintln!("  page counters did not settle; the last pass was kept");
    }
    Ok(())
}

fn example_report_json() -> &'static str {
    r##"{
  "pages": {
    "default": {
      "size": "A5",
      "margin": { "top": 54, "right": 42, "bottom": 54, "left": 42 },
      "marginBoxes": [
        {
          "slot": "top-center",
          "content": [{ "string": "chapter" }]
        },
        {
          "slot": "bottom-center",
          "content": ["Page ", { "counter": "page" }, " of ", { "counter": "pages" }]
        }
      ]
    },
    "first": {
      "marginBoxes": [{ "slot": "top-center", "content": [] }]
    },
    "named": {
      "wide": { "size": { "Custom": { "width": 595.28, "height": 419.53 } } }
    }
  },
  "children": [
    {
      "kind": { "type": "Text", "content": "Quarterly Report" },
      "style": { "fontSize": 24, "margin": { "top": { "Pt": 0 }, "right": { "Pt": 0 }, "bottom": { "Pt": 18 }, "left": { "Pt": 0 } } }
    },
    {
      "kind": {
        "type": "Text",
        "items": ["Totals are on page ", { "target": "totals", "counter": "page" }, "."]
      }
    },
    {
      "kind": { "type": "Text", "content": "Overview" },
      "style": {
        "fontSize": 16,
        "breakBefore": "Page",
        "stringSet": [{ "name": "chapter" }]
      }
    },
    {
      "kind": { "type": "View" },
      "style": { "columnCount": 2, "columnGap": 12 },
      "children": [
        { "kind": { "type": "Text", "content": "Revenue grew in every region this quarter, led by the northern sales office and a strong finish in the last month." } },
        { "kind": { "type": "Text", "content": "Costs stayed flat. Hiring slowed after the first month and travel spending fell for the second quarter in a row." } },
        { "kind": { "type": "Text", "content": "The outlook for next quarter is cautious but the order book is the fullest it has been in two years." } }
      ]
    },
    {
      "kind": { "type": "Text", "content": "Totals" },
      "id": "totals",
      "style": {
        "fontSize": 16,
        "breakBefore": "Right",
        "page": "wide",
        "stringSet": [{ "name": "chapter" }]
      }
    },
    {
      "kind": {
        "type": "Table",
        "columns": [
          { "width": { "Fraction": 0.6 } },
          { "width": { "Fraction": 0.4 } }
        ]
      },
      "style": { "page": "wide" },
      "children": [
        {
          "kind": { "type": "TableRow", "isHeader": true },
          "children": [
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "Region" } }] },
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "Revenue" } }] }
          ]
        },
        {
          "kind": { "type": "TableRow" },
          "children": [
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "North" } }] },
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "1,204,000" } }] }
          ]
        },
        {
          "kind": { "type": "TableRow" },
          "children": [
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "South" } }] },
            { "kind": { "type": "TableCell" }, "children": [{ "kind": { "type": "Text", "content": "873,500" } }] }
          ]
        }
      ]
    }
  ]
}
"##
}
