//! Declarative click handlers from decoded layout resources
//!
//! Layout names come from `res/values*/public.xml`, each named layout is
//! then read from `res/layout/<name>.xml` and every element carrying an
//! `android:onClick` attribute contributes a `void <name>(android.view.View)`
//! handler.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use blanket::blanket;
use log::{debug, trace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use thiserror::Error;

use crate::ir::{MethodSig, Type};
use crate::utils::path_must_str;

pub const VIEW_CLASS: &str = "android.view.View";
pub const ON_CLICK_ATTRIBUTE: &str = "android:onClick";

pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("resource directory {0:?} doesn't exist")]
    NoResources(PathBuf),

    #[error("failed to read {0:?}: {1}")]
    Io(PathBuf, io::Error),

    #[error("error parsing XML file {0:?}: {1}")]
    Xml(PathBuf, String),
}

/// Source of declarative handler methods
#[blanket(derive(Ref, Box))]
pub trait HandlerSource {
    /// Every handler subsignature found, in sorted order
    fn handlers(&self) -> LayoutResult<BTreeSet<MethodSig>>;
}

/// Fixed handler set, used when no decoded resources are available
impl HandlerSource for BTreeSet<MethodSig> {
    fn handlers(&self) -> LayoutResult<BTreeSet<MethodSig>> {
        Ok(self.clone())
    }
}

/// Signature of an `android:onClick` handler named `name`
pub fn on_click_signature(name: &str) -> MethodSig {
    MethodSig::new(Type::Void, name, vec![Type::class(VIEW_CLASS)])
}

/// [HandlerSource] reading the `res` directory of a decoded archive
pub struct LayoutHandlers {
    res_dir: PathBuf,
}

type XmlReader = quick_xml::Reader<BufReader<File>>;

fn find_attribute<P>(bs: &BytesStart, matches: P) -> Option<String>
where
    P: Fn(&QName) -> bool,
{
    for e in bs.attributes() {
        let att = match e {
            Ok(v) => v,
            Err(_) => continue,
        };

        if matches(&att.key) {
            return match String::from_utf8_lossy(&att.value) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(s) => Some(String::from(s)),
            };
        }
    }
    None
}

fn get_attribute_value(bs: &BytesStart, name: &str) -> Option<String> {
    find_attribute(bs, |key| key.local_name().as_ref() == name.as_bytes())
}

/// Attribute lookup by its prefixed name, such as `android:onClick`
fn get_qualified_attribute_value(bs: &BytesStart, qualified: &str) -> Option<String> {
    find_attribute(bs, |key| key.as_ref() == qualified.as_bytes())
}

fn has_attribute_value(bs: &BytesStart, name: &str, expected: &str) -> bool {
    get_attribute_value(bs, name).map_or(false, |it| it == expected)
}

fn open_xml(path: &Path) -> LayoutResult<XmlReader> {
    let file = File::open(path).map_err(|e| LayoutError::Io(path.to_path_buf(), e))?;
    Ok(quick_xml::Reader::from_reader(BufReader::new(file)))
}

/// Visit every start or empty element of the XML file at `path`
fn for_each_element<F>(path: &Path, mut f: F) -> LayoutResult<()>
where
    F: FnMut(&BytesStart),
{
    let mut xml = open_xml(path)?;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(bs)) | Ok(Event::Empty(bs)) => f(&bs),
            Ok(Event::Eof) => break,
            Err(e) => return Err(LayoutError::Xml(path.to_path_buf(), e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

impl LayoutHandlers {
    /// Handlers from `<decoded>/res`
    pub fn new(decoded_dir: &Path) -> Self {
        Self {
            res_dir: decoded_dir.join("res"),
        }
    }

    pub fn get_res_dir(&self) -> &Path {
        &self.res_dir
    }

    /// All `public.xml` files under `res/values*`, sorted by directory name
    fn public_xml_files(&self) -> LayoutResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.res_dir)
            .map_err(|e| LayoutError::Io(self.res_dir.clone(), e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LayoutError::Io(self.res_dir.clone(), e))?;
            let is_values = entry
                .file_name()
                .to_str()
                .map_or(false, |it| it.starts_with("values"));
            let public = entry.path().join("public.xml");
            if is_values && public.is_file() {
                files.push(public);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Names of every layout declared in the public resource tables
    pub fn layout_names(&self) -> LayoutResult<BTreeSet<String>> {
        if !self.res_dir.is_dir() {
            return Err(LayoutError::NoResources(self.res_dir.clone()));
        }
        let mut names = BTreeSet::new();
        for path in self.public_xml_files()? {
            for_each_element(&path, |bs| {
                if bs.local_name().as_ref() != b"public" || !has_attribute_value(bs, "type", "layout")
                {
                    return;
                }
                if let Some(name) = get_attribute_value(bs, "name") {
                    names.insert(name);
                }
            })?;
        }
        Ok(names)
    }

    /// Values of the `android:onClick` attributes in one layout file
    pub fn on_click_names(path: &Path) -> LayoutResult<Vec<String>> {
        let mut names = Vec::new();
        for_each_element(path, |bs| {
            let Some(value) = get_qualified_attribute_value(bs, ON_CLICK_ATTRIBUTE) else {
                return;
            };
            // Data binding expressions are not method names
            if value.starts_with("@{") {
                trace!("skipping binding expression {} in {}", value, path_must_str(path));
                return;
            }
            names.push(value);
        })?;
        Ok(names)
    }
}

impl HandlerSource for LayoutHandlers {
    fn handlers(&self) -> LayoutResult<BTreeSet<MethodSig>> {
        let layout_dir = self.res_dir.join("layout");
        let mut handlers = BTreeSet::new();
        for name in self.layout_names()? {
            let path = layout_dir.join(format!("{}.xml", name));
            if !path.is_file() {
                debug!("layout {} has no file at {}", name, path_must_str(&path));
                continue;
            }
            for handler in Self::on_click_names(&path)? {
                handlers.insert(on_click_signature(&handler));
            }
        }
        debug!(
            "found {} onClick handlers under {}",
            handlers.len(),
            path_must_str(&self.res_dir)
        );
        Ok(handlers)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext, TreeEntry};
    use rstest::*;

    const PUBLIC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <public type="attr" name="colorAccent" id="0x7f010000" />
    <public type="layout" name="activity_main" id="0x7f0b0000" />
    <public type="layout" name="dialog" id="0x7f0b0001" />
    <public type="layout" name="missing" id="0x7f0b0002" />
</resources>
"#;

    const PUBLIC_V21: &str = r#"<resources>
    <public type="layout" name="extra" id="0x7f0b0003" />
</resources>
"#;

    const MAIN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android" xmlns:app="http://schemas.android.com/apk/res-auto">
    <Button android:id="@id/go" android:onClick="onGo" />
    <Button android:id="@id/stop" android:onClick="onStop">
    </Button>
    <Button android:onClick="@{() -> vm.go()}" />
    <Button app:onClick="onCustom" />
    <TextView android:text="hi" />
</LinearLayout>
"#;

    const DIALOG: &str = r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <Button android:onClick="onGo" />
    <Button android:onClick="dismiss" />
</FrameLayout>
"#;

    const EXTRA: &str = r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <ImageView android:onClick="zoom" />
</FrameLayout>
"#;

    fn decoded(ctx: &TestContext) -> PathBuf {
        ctx.create_tree(&[
            ("app/res/values/public.xml", TreeEntry::TxtFile(PUBLIC)),
            ("app/res/values-v21/public.xml", TreeEntry::TxtFile(PUBLIC_V21)),
            ("app/res/layout/activity_main.xml", TreeEntry::TxtFile(MAIN)),
            ("app/res/layout/dialog.xml", TreeEntry::TxtFile(DIALOG)),
            ("app/res/layout/extra.xml", TreeEntry::TxtFile(EXTRA)),
            ("app/res/drawable", TreeEntry::Dir),
        ])
        .unwrap();
        ctx.to_abs("app")
    }

    #[rstest]
    fn test_layout_names(tmp_context: TestContext) {
        let handlers = LayoutHandlers::new(&decoded(&tmp_context));
        let names: Vec<String> = handlers.layout_names().unwrap().into_iter().collect();
        assert_eq!(names, vec!["activity_main", "dialog", "extra", "missing"]);
    }

    #[rstest]
    fn test_handlers(tmp_context: TestContext) {
        let handlers = LayoutHandlers::new(&decoded(&tmp_context)).handlers().unwrap();
        let sigs: Vec<String> = handlers.iter().map(|it| it.to_string()).collect();
        assert_eq!(
            sigs,
            vec![
                "void dismiss(android.view.View)",
                "void onGo(android.view.View)",
                "void onStop(android.view.View)",
                "void zoom(android.view.View)",
            ]
        );
    }

    #[rstest]
    fn test_on_click_needs_android_prefix(tmp_context: TestContext) {
        let dir = decoded(&tmp_context);
        let names = LayoutHandlers::on_click_names(&dir.join("res/layout/activity_main.xml")).unwrap();
        assert_eq!(names, vec!["onGo", "onStop"]);
    }

    #[rstest]
    fn test_missing_resources(tmp_context: TestContext) {
        let handlers = LayoutHandlers::new(&tmp_context.to_abs("nope"));
        assert!(matches!(handlers.handlers(), Err(LayoutError::NoResources(_))));
    }

    #[rstest]
    fn test_malformed_layout(tmp_context: TestContext) {
        let dir = decoded(&tmp_context);
        std::fs::write(
            dir.join("res/layout/dialog.xml"),
            "<FrameLayout><Button android:onClick=\"x\"></FrameLayout>",
        )
        .unwrap();
        let res = LayoutHandlers::new(&dir).handlers();
        assert!(matches!(res, Err(LayoutError::Xml(..))), "{:?}", res);
    }

    #[test]
    fn test_fixed_set() {
        let set: BTreeSet<MethodSig> = [on_click_signature("b"), on_click_signature("a")]
            .into_iter()
            .collect();
        let handlers = set.handlers().unwrap();
        assert_eq!(handlers.iter().next().unwrap().name, "a");
    }
}
