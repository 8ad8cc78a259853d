use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::utils::{open_file, path_must_str, ClassName};

pub const MAIN_ACTION: &str = "android.intent.action.MAIN";
pub const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";

#[derive(Deserialize, Debug)]
pub struct Action {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Deserialize, Debug)]
pub struct Category {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Deserialize, Debug)]
pub struct IntentFilter {
    #[serde(rename = "action", default = "Vec::new")]
    actions: Vec<Action>,

    #[serde(rename = "category", default = "Vec::new")]
    categories: Vec<Category>,
}

impl IntentFilter {
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|it| it.name == action)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|it| it.name == category)
    }
}

#[derive(Deserialize, Debug)]
pub struct Activity {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "intent-filter", default = "Vec::new")]
    pub intent_filters: Vec<IntentFilter>,
}

#[derive(Deserialize, Debug)]
pub struct ActivityAlias {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "@targetActivity")]
    target_activity: String,

    #[serde(rename = "intent-filter", default = "Vec::new")]
    pub intent_filters: Vec<IntentFilter>,
}

fn is_main(filters: &[IntentFilter]) -> bool {
    filters.iter().any(|it| it.has_action(MAIN_ACTION))
}

#[derive(Deserialize, Debug, Default)]
pub struct Application {
    #[serde(rename = "activity", default = "Vec::new")]
    activities: Vec<Activity>,

    #[serde(rename = "activity-alias", default = "Vec::new")]
    activity_aliases: Vec<ActivityAlias>,
}

/// The parts of `AndroidManifest.xml` needed to find entry points
#[derive(Deserialize, Debug)]
#[serde(rename = "manifest")]
pub struct Manifest {
    #[serde(rename = "@package")]
    package: String,
    #[serde(default)]
    application: Application,
}

impl Manifest {
    pub fn parse(s: &str) -> crate::Result<Self> {
        quick_xml::de::from_str(s).map_err(|e| crate::Error::ManifestParse(e.to_string()))
    }

    /// Parse an AndroidManifest.xml file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let file = open_file(path)?;
        let br = BufReader::new(file);
        quick_xml::de::from_reader(br).map_err(|e| {
            log::error!("failed to deserialize {}: {}", path_must_str(path), e);
            crate::Error::ManifestParse(e.to_string())
        })
    }

    pub fn package(&self) -> &str {
        self.package.as_str()
    }

    pub fn get_activities(&self) -> &[Activity] {
        self.application.activities.as_slice()
    }

    /// Fully qualify a component name: `.Main` and `Main` are relative to
    /// the package
    pub fn qualify(&self, name: &str) -> ClassName {
        let cn = ClassName::from_split_manifest(&self.package, name);
        if cn.has_pkg() {
            cn
        } else {
            ClassName::from(format!("{}.{}", self.package, name))
        }
    }

    /// Activities launched through `android.intent.action.MAIN`, aliases
    /// resolve to their target
    pub fn main_activities(&self) -> Vec<ClassName> {
        let direct = self
            .application
            .activities
            .iter()
            .filter(|it| is_main(&it.intent_filters))
            .map(|it| it.name.as_str());
        let aliased = self
            .application
            .activity_aliases
            .iter()
            .filter(|it| is_main(&it.intent_filters))
            .map(|it| it.target_activity.as_str());

        let mut found: Vec<ClassName> = Vec::new();
        for name in direct.chain(aliased) {
            let cn = self.qualify(name);
            if !found.contains(&cn) {
                found.push(cn);
            }
        }
        found
    }

    pub fn is_main_activity(&self, class: &str) -> bool {
        self.main_activities().iter().any(|it| it == class)
    }
}
