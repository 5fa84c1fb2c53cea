//! Stage table listing: `stagecraft stages`.

use stagecraft::role::AgentRole;
use stagecraft::stage::StageRegistry;

fn role_list(roles: &[AgentRole]) -> String {
    if roles.is_empty() {
        "-".to_string()
    } else {
        roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
    }
}

pub fn cmd_stages() {
    let registry = StageRegistry::standard();

    println!();
    println!("{}", console::style("Pipeline Stages").bold().cyan());
    println!();

    for (index, def) in registry.stages_in_order().iter().enumerate() {
        let mandatory = if def.mandatory {
            console::style("mandatory").green()
        } else {
            console::style("optional").dim()
        };
        println!(
            "{:>2}. {} ({}, up to {} retries)",
            index + 1,
            console::style(def.stage.as_str()).bold(),
            mandatory,
            def.retry_ceiling
        );
        println!("      primary:    {}", def.primary_role);
        println!("      supporting: {}", role_list(&def.supporting_roles));
        println!("      reviewers:  {}", role_list(&def.reviewer_roles));
        if !def.required_input_types.is_empty() {
            let inputs: Vec<&str> = def.required_input_types.iter().map(|t| t.as_str()).collect();
            println!("      inputs:     {}", inputs.join(", "));
        }
    }
    println!();
}
