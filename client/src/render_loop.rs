use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into one `requestAnimationFrame` callback.
///
/// `mark_dirty()` may be called any number of times per frame. The paint
/// function returns `true` while an animation (a fly-to) still needs frames.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    dirty: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn request_frame(&self) {
        if self.raf_id.get().is_some() {
            return;
        }
        let callback = self.callback.borrow();
        let (Some(window), Some(cb)) = (self.window.as_ref(), callback.as_ref()) else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.raf_id.set(Some(id));
        }
    }
}

impl RenderScheduler {
    pub fn new(paint: impl Fn() -> bool + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            dirty: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let frame_inner = Rc::clone(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            frame_inner.raf_id.set(None);
            if !frame_inner.dirty.replace(false) {
                return;
            }
            if paint() {
                frame_inner.dirty.set(true);
                frame_inner.request_frame();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn mark_dirty(&self) {
        self.inner.dirty.set(true);
        self.inner.request_frame();
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.take()
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.dirty.set(false);
        // The closure holds an `Rc<Inner>`; drop it to break the cycle.
        self.inner.callback.borrow_mut().take();
    }
}
