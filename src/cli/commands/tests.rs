//! Tests command: list the registered test packages

use crate::cli::args::TestsArgs;
use crate::registry::{Arg, all_tests};
use colored::*;

pub fn list_tests(args: &TestsArgs) {
    let mut current_package = "";
    for test in all_tests()
        .iter()
        .filter(|t| args.package.as_deref().is_none_or(|p| p == t.package))
    {
        if test.package != current_package {
            current_package = test.package;
            println!("\n{}", current_package.bold());
        }
        let accepts: Vec<&str> = test.accepts.iter().map(|a: &Arg| a.name()).collect();
        println!(
            "   • {} ({}) - {}",
            test.name.cyan(),
            accepts.join(", "),
            test.long_name
        );
    }
}
