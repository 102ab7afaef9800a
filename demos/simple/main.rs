use adtargeting::{
    AdUnit, Geography, Record, Result, Target, TargetType, TargetingCriterion, TreeBuilderConfig,
};

fn adunit(id: &str, parent_id: Option<&str>, name: &str) -> Target {
    AdUnit {
        id: Some(id.into()),
        parent_id: parent_id.map(Into::into),
        name: Some(name.into()),
        ..Default::default()
    }
    .into()
}

// Stand-in for a call to the ad server's inventory API.
fn fetch_targets(target_type: TargetType) -> Result<Vec<Target>> {
    Ok(match target_type {
        TargetType::AdUnit => vec![
            adunit("SITE", None, "Site"),
            adunit("SPORTS", Some("SITE"), "Sports"),
            adunit("HOCKEY", Some("SPORTS"), "Sports/Hockey"),
            adunit("BASEBALL", Some("SPORTS"), "Sports/Baseball"),
        ],
        _ => Vec::new(),
    })
}

pub fn main() -> Result<()> {
    env_logger::init();

    let builder = TreeBuilderConfig::from_source(fetch_targets).to_builder();
    let tree = builder.construct_tree(TargetType::AdUnit)?;

    let sports = tree
        .get_subtree("name", "Sports")
        .and_then(|subtree| subtree.node())
        .cloned();
    println!("Max depth: {:?}", tree.get_max_depth());

    let usa: Target = Geography {
        name: Some("United States".into()),
        kind: Some("COUNTRY".into()),
        ..Default::default()
    }
    .into();

    // Show US traffic everywhere except the sports section.
    let mut criterion = TargetingCriterion::from_target(usa);
    if let Some(sports) = sports {
        criterion = criterion & !TargetingCriterion::from_target(sports);
    }

    println!("{}", serde_json::to_string_pretty(&criterion.to_doc()).unwrap_or_default());

    Ok(())
}
