use std::collections::BTreeMap;

use crate::ir::MethodSig;
use crate::utils::ClassName;

/// Listener interfaces declared in `android.view` and their callbacks
const ANDROID_VIEW_LISTENERS: &[(&str, &[&str])] = &[
    (
        "android.view.ActionProvider$VisibilityListener",
        &["void onActionProviderVisibilityChanged(boolean)"],
    ),
    (
        "android.view.GestureDetector$OnDoubleTapListener",
        &[
            "boolean onDoubleTap(android.view.MotionEvent)",
            "boolean onDoubleTapEvent(android.view.MotionEvent)",
            "boolean onSingleTapConfirmed(android.view.MotionEvent)",
        ],
    ),
    (
        "android.view.GestureDetector$OnGestureListener",
        &[
            "boolean onDown(android.view.MotionEvent)",
            "boolean onFling(android.view.MotionEvent,android.view.MotionEvent,float,float)",
            "void onLongPress(android.view.MotionEvent)",
            "boolean onScroll(android.view.MotionEvent,android.view.MotionEvent,float,float)",
            "void onShowPress(android.view.MotionEvent)",
            "boolean onSingleTapUp(android.view.MotionEvent)",
        ],
    ),
    (
        "android.view.MenuItem$OnActionExpandListener",
        &[
            "boolean onMenuItemActionCollapse(android.view.MenuItem)",
            "boolean onMenuItemActionExpand(android.view.MenuItem)",
        ],
    ),
    (
        "android.view.MenuItem$OnMenuItemClickListener",
        &["boolean onMenuItemClick(android.view.MenuItem)"],
    ),
    (
        "android.view.ScaleGestureDetector$OnScaleGestureListener",
        &[
            "boolean onScale(android.view.ScaleGestureDetector)",
            "boolean onScaleBegin(android.view.ScaleGestureDetector)",
            "void onScaleEnd(android.view.ScaleGestureDetector)",
        ],
    ),
    (
        "android.view.TextureView$SurfaceTextureListener",
        &[
            "void onSurfaceTextureAvailable(android.graphics.SurfaceTexture,int,int)",
            "boolean onSurfaceTextureDestroyed(android.graphics.SurfaceTexture)",
            "void onSurfaceTextureSizeChanged(android.graphics.SurfaceTexture,int,int)",
            "void onSurfaceTextureUpdated(android.graphics.SurfaceTexture)",
        ],
    ),
    (
        "android.view.View$OnAttachStateChangeListener",
        &[
            "void onViewAttachedToWindow(android.view.View)",
            "void onViewDetachedFromWindow(android.view.View)",
        ],
    ),
    (
        "android.view.View$OnClickListener",
        &["void onClick(android.view.View)"],
    ),
    (
        "android.view.View$OnCreateContextMenuListener",
        &["void onCreateContextMenu(android.view.ContextMenu,android.view.View,android.view.ContextMenu$ContextMenuInfo)"],
    ),
    (
        "android.view.View$OnDragListener",
        &["boolean onDrag(android.view.View,android.view.DragEvent)"],
    ),
    (
        "android.view.View$OnFocusChangeListener",
        &["void onFocusChange(android.view.View,boolean)"],
    ),
    (
        "android.view.View$OnGenericMotionListener",
        &["boolean onGenericMotion(android.view.View,android.view.MotionEvent)"],
    ),
    (
        "android.view.View$OnHoverListener",
        &["boolean onHover(android.view.View,android.view.MotionEvent)"],
    ),
    (
        "android.view.View$OnKeyListener",
        &["boolean onKey(android.view.View,int,android.view.KeyEvent)"],
    ),
    (
        "android.view.View$OnLayoutChangeListener",
        &["void onLayoutChange(android.view.View,int,int,int,int,int,int,int,int)"],
    ),
    (
        "android.view.View$OnLongClickListener",
        &["boolean onLongClick(android.view.View)"],
    ),
    (
        "android.view.View$OnSystemUiVisibilityChangeListener",
        &["void onSystemUiVisibilityChange(int)"],
    ),
    (
        "android.view.View$OnTouchListener",
        &["boolean onTouch(android.view.View,android.view.MotionEvent)"],
    ),
    (
        "android.view.ViewGroup$OnHierarchyChangeListener",
        &[
            "void onChildViewAdded(android.view.View,android.view.View)",
            "void onChildViewRemoved(android.view.View,android.view.View)",
        ],
    ),
    (
        "android.view.ViewStub$OnInflateListener",
        &["void onInflate(android.view.ViewStub,android.view.View)"],
    ),
    (
        "android.view.ViewTreeObserver$OnDrawListener",
        &["void onDraw()"],
    ),
    (
        "android.view.ViewTreeObserver$OnGlobalFocusChangeListener",
        &["void onGlobalFocusChanged(android.view.View,android.view.View)"],
    ),
    (
        "android.view.ViewTreeObserver$OnGlobalLayoutListener",
        &["void onGlobalLayout()"],
    ),
    (
        "android.view.ViewTreeObserver$OnPreDrawListener",
        &["boolean onPreDraw()"],
    ),
    (
        "android.view.ViewTreeObserver$OnScrollChangedListener",
        &["void onScrollChanged()"],
    ),
    (
        "android.view.ViewTreeObserver$OnTouchModeChangeListener",
        &["void onTouchModeChanged(boolean)"],
    ),
    (
        "android.view.ViewTreeObserver$OnWindowAttachListener",
        &["void onWindowAttached()", "void onWindowDetached()"],
    ),
    (
        "android.view.ViewTreeObserver$OnWindowFocusChangeListener",
        &["void onWindowFocusChanged(boolean)"],
    ),
];

/// Listener interfaces whose callbacks get invoked on registered fields,
/// mapped to the callback subsignatures in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerRegistry {
    callbacks: BTreeMap<ClassName, Vec<MethodSig>>,
}

impl ListenerRegistry {
    /// The listener interfaces of `android.view`
    pub fn android_view() -> Self {
        Self::from_entries(ANDROID_VIEW_LISTENERS.iter().map(|(iface, sigs)| {
            let sigs = sigs
                .iter()
                .map(|it| MethodSig::parse(it).expect("valid callback signature"))
                .collect();
            (ClassName::from(*iface), sigs)
        }))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ClassName, Vec<MethodSig>)>,
    {
        Self {
            callbacks: entries.into_iter().collect(),
        }
    }

    /// Callbacks of `iface`, empty when the interface is not registered
    pub fn callbacks(&self, iface: &str) -> &[MethodSig] {
        self.callbacks
            .get(iface)
            .map(|it| it.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, iface: &str) -> bool {
        self.callbacks.contains_key(iface)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &ClassName> {
        self.callbacks.keys()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_android_view_registry() {
        let registry = ListenerRegistry::android_view();
        assert_eq!(registry.len(), 29);
        assert!(registry
            .interfaces()
            .all(|it| it.as_str().starts_with("android.view.")));
        let sigs: Vec<String> = registry
            .callbacks("android.view.GestureDetector$OnGestureListener")
            .iter()
            .map(|it| it.to_string())
            .collect();
        assert_eq!(sigs.len(), 6);
        assert_eq!(
            sigs[1],
            "boolean onFling(android.view.MotionEvent,android.view.MotionEvent,float,float)"
        );
    }

    #[test]
    fn test_lookup_is_stable() {
        let registry = ListenerRegistry::android_view();
        let first = registry.callbacks("android.view.View$OnClickListener").to_vec();
        let second = registry.callbacks("android.view.View$OnClickListener").to_vec();
        assert_eq!(first, second);
        assert_eq!(first[0].to_string(), "void onClick(android.view.View)");
        assert!(registry.contains("android.view.View$OnKeyListener"));
        assert!(!registry.contains("android.view.View"));
        assert!(registry.callbacks("java.lang.Runnable").is_empty());
    }

    #[test]
    fn test_custom_registry() {
        let registry = ListenerRegistry::from_entries([(
            ClassName::from("java.lang.Runnable"),
            vec![MethodSig::parse("void run()").unwrap()],
        )]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.callbacks("java.lang.Runnable").len(), 1);
    }
}
