use std::collections::HashMap;

use clap::Parser;

use mpe_rs::atoms::GroundAtoms;
use mpe_rs::clause::WeightedFormula;
use mpe_rs::formula::Formula;
use mpe_rs::mpe::{GroundModel, MapInference, MaxWalkSatInference};
use mpe_rs::node::{Domain, NodeSpec};
use mpe_rs::walksat::{ClauseSelection, SearchConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of search steps.
    #[arg(long, value_name = "INT", default_value = "10000")]
    steps: usize,

    /// Probability of a random walk move.
    #[arg(short, value_name = "FLOAT", default_value = "0.5")]
    p: f64,

    /// Random seed.
    #[arg(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Repair the heaviest violated clause instead of a random one.
    #[arg(long)]
    heaviest: bool,

    /// Print the clausal knowledge base.
    #[arg(long)]
    show_kb: bool,
}

const PEOPLE: [&str; 4] = ["Anna", "Bob", "Chris", "Dan"];
const FRIENDS: [(&str, &str); 4] = [("Anna", "Bob"), ("Bob", "Anna"), ("Bob", "Chris"), ("Chris", "Bob")];

/// Literal of a boolean node with its parameters bound to the given constants.
fn literal(
    atoms: &mut GroundAtoms,
    node: &NodeSpec,
    value: bool,
    binding: &[(&str, &str)],
) -> color_eyre::Result<Formula> {
    let substitution: HashMap<String, String> =
        binding.iter().map(|&(p, c)| (p.to_string(), c.to_string())).collect();
    let setting = if value { 0 } else { 1 };
    let text = node.to_literal(&Domain::boolean(), setting, Some(&substitution))?;
    Ok(atoms.parse_literal(&text)?)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let smokes: NodeSpec = "Smokes(x)".parse()?;
    let cancer: NodeSpec = "Cancer(x)".parse()?;
    let friends: NodeSpec = "Friends(x,y)".parse()?;
    println!("nodes: {}, {}, {}", smokes, cancer, friends);

    let mut model = GroundModel::new();

    // Smoking causes cancer.
    for x in PEOPLE {
        let s = literal(&mut model.atoms, &smokes, true, &[("x", x)])?;
        let c = literal(&mut model.atoms, &cancer, true, &[("x", x)])?;
        model.add_formula(WeightedFormula::new(Formula::implies(s, c), 1.5));
    }

    // Friends have similar smoking habits; nobody is their own friend.
    for x in PEOPLE {
        for y in PEOPLE {
            let binding = [("x", x), ("y", y)];
            if x == y {
                let f = literal(&mut model.atoms, &friends, false, &binding)?;
                model.add_formula(WeightedFormula::hard(f, 10.0));
                continue;
            }
            let f = literal(&mut model.atoms, &friends, true, &binding)?;
            let sx = literal(&mut model.atoms, &smokes, true, &[("x", x)])?;
            let sy = literal(&mut model.atoms, &smokes, true, &[("x", y)])?;
            model.add_formula(WeightedFormula::new(Formula::implies(f, Formula::iff(sx, sy)), 1.1));
        }
    }

    // Smoking is rare.
    for x in PEOPLE {
        let s = literal(&mut model.atoms, &smokes, true, &[("x", x)])?;
        model.add_formula(WeightedFormula::new(s, -0.5));
    }

    for x in PEOPLE {
        for y in PEOPLE {
            let name = friends.variable_name(&[x, y])?;
            model.observe(&name, FRIENDS.contains(&(x, y)))?;
        }
    }
    model.observe(&smokes.variable_name(&["Anna"])?, true)?;

    println!(
        "{} ground atoms, {} formulas, {} observed",
        model.atoms.len(),
        model.formulas.len(),
        model.evidence.len()
    );

    let selection = if args.heaviest {
        ClauseSelection::Heaviest
    } else {
        ClauseSelection::Uniform
    };
    let config = SearchConfig::default()
        .with_p(args.p)
        .with_seed(args.seed)
        .with_selection(selection);
    let mut inference = MaxWalkSatInference::new(&model, config)?;
    if args.show_kb {
        println!("Knowledge base:\n{}", inference.kb());
    }

    let names: Vec<String> = PEOPLE
        .iter()
        .flat_map(|&x| [smokes.variable_name(&[x]), cancer.variable_name(&[x])])
        .collect::<Result<_, _>>()?;
    let queries: Vec<&str> = names.iter().map(String::as_str).collect();

    let time_search = std::time::Instant::now();
    let results = inference.infer(&queries, args.steps)?;
    let time_search = time_search.elapsed();

    println!("{}: {:?} after {} steps", inference.algorithm_name(), inference.status(), inference.engine().steps());
    if let Some(w) = inference.engine().best_violated_weight() {
        println!("Best violated weight: {}", w);
    }
    for r in &results {
        println!("  {}", r);
    }

    println!("Search time: {:.3}s", time_search.as_secs_f64());
    println!("Total time: {:.3}s", time_total.elapsed().as_secs_f64());

    Ok(())
}
