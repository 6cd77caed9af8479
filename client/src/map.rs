use std::cell::{Cell, RefCell};
use std::f64::consts::{FRAC_PI_4, TAU};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, MouseEvent, PointerEvent,
    WheelEvent,
};

use siam_shared::company::OFFICE_ZOOM;
use siam_shared::geo::PathKind;
use siam_shared::{Bounds, BoundsCache, Geometry, LatLng, RegionEntity, RegionKind, TerritorySets};

use crate::app::{
    ActiveModal, Boundary, Company, Hovered, Layers, LoadState, MapCommand, MapCommands,
    MousePos, OpenModal, RegionRef, Selected, Territory, TerritoryLoad, VisibleLayers,
};
use crate::colors::{self, LayerStyle};
use crate::render_loop::RenderScheduler;
use crate::search::MapSearch;
use crate::viewport::{self, FIT_PADDING_PX, MAX_ZOOM, SEARCH_MAX_ZOOM, Viewport};

const FIT_DURATION_MS: f64 = 700.0;
const FLY_DURATION_MS: f64 = 2000.0;
const CLICK_SLOP_PX: f64 = 5.0;
const POINT_RADIUS_PX: f64 = 4.0;
const MARKER_HEAD_RADIUS_PX: f64 = 10.0;
const MARKER_HEIGHT_PX: f64 = 28.0;

/// Back to front.
const DRAW_ORDER: [RegionKind; 3] = [
    RegionKind::Department,
    RegionKind::Province,
    RegionKind::District,
];

/// What a map popup is anchored to.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PopupTarget {
    Region(RegionRef),
    Office,
}

#[derive(Clone, Copy)]
struct Popup(RwSignal<Option<(PopupTarget, LatLng)>>);

/// An in-flight camera move.
struct Flight {
    from: Viewport,
    to: Viewport,
    started_at: f64,
    duration_ms: f64,
}

/// Topmost visible region under `point`: districts first, then provinces,
/// then departments. Within a tier the last drawn wins.
pub(crate) fn hit_test(
    sets: &TerritorySets,
    layers: VisibleLayers,
    point: LatLng,
) -> Option<RegionRef> {
    DRAW_ORDER
        .into_iter()
        .rev()
        .filter(|kind| layers.shows(*kind))
        .find_map(|kind| {
            sets.layer(kind)
                .iter()
                .enumerate()
                .rev()
                .find(|(_, entity)| {
                    entity.bounds.is_some_and(|b| b.contains(point))
                        && entity.geometry.contains(point)
                })
                .map(|(index, _)| RegionRef { kind, index })
        })
}

/// Hover tooltip text, title first.
pub(crate) fn tooltip_lines(entity: &RegionEntity) -> Vec<String> {
    let code = entity.code.as_deref().unwrap_or("-");
    let or_dash = |value: &Option<String>| value.as_deref().unwrap_or("-").to_owned();
    match entity.kind {
        RegionKind::Department => vec![entity.name.clone(), format!("Ubigeo: {code}")],
        RegionKind::Province => vec![
            entity.name.clone(),
            format!("Provincia de: {}", or_dash(&entity.parent_name)),
            format!("Ubigeo: {code}"),
        ],
        RegionKind::District => vec![
            "Territorio SIAMsoft".to_owned(),
            format!("Municipalidad de {}", entity.name),
            format!("Departamento: {}", or_dash(&entity.parent_name)),
            format!("Provincia: {}", or_dash(&entity.parent_province)),
            format!("Ubigeo: {code}"),
        ],
    }
}

/// Click popup for a served municipality: `"{cod_eje} - {nom_eje}"`.
pub(crate) fn entity_caption(entity: &RegionEntity) -> Option<String> {
    if entity.kind != RegionKind::District {
        return None;
    }
    match (entity.entity_code.as_deref(), entity.entity_name.as_deref()) {
        (None, None) => None,
        (code, name) => Some(format!("{} - {}", code.unwrap_or(""), name.unwrap_or(""))),
    }
}

fn overlaps(a: &Bounds, b: &Bounds) -> bool {
    a.south_west.lat <= b.north_east.lat
        && a.north_east.lat >= b.south_west.lat
        && a.south_west.lng <= b.north_east.lng
        && a.north_east.lng >= b.south_west.lng
}

fn visible_bounds(vp: &Viewport, w: f64, h: f64) -> Bounds {
    Bounds::new(vp.screen_to_latlng(0.0, h), vp.screen_to_latlng(w, 0.0))
}

fn context_2d(
    canvas: &HtmlCanvasElement,
    cache: &RefCell<Option<CanvasRenderingContext2d>>,
) -> Option<CanvasRenderingContext2d> {
    if let Some(ctx) = cache.borrow().as_ref() {
        return Some(ctx.clone());
    }
    let ctx = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())?;
    *cache.borrow_mut() = Some(ctx.clone());
    Some(ctx)
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: &[f64]) {
    let segments = js_sys::Array::new();
    for d in dash {
        segments.push(&JsValue::from_f64(*d));
    }
    ctx.set_line_dash(&segments).ok();
}

/// Build the current path from `geometry`; `true` when it has area to fill.
fn trace(ctx: &CanvasRenderingContext2d, vp: &Viewport, geometry: &Geometry) -> bool {
    ctx.begin_path();
    let mut fillable = false;
    geometry.for_each_path(&mut |kind, path| {
        let mut points = path
            .iter()
            .map(|p| vp.latlng_to_screen(LatLng::new(p.y, p.x)));
        match kind {
            PathKind::Point => {
                for (x, y) in points {
                    ctx.move_to(x + POINT_RADIUS_PX, y);
                    ctx.arc(x, y, POINT_RADIUS_PX, 0.0, TAU).ok();
                }
                fillable = true;
            }
            PathKind::Line | PathKind::Ring => {
                let Some((x, y)) = points.next() else {
                    return;
                };
                ctx.move_to(x, y);
                for (x, y) in points {
                    ctx.line_to(x, y);
                }
                if kind == PathKind::Ring {
                    ctx.close_path();
                    fillable = true;
                }
            }
        }
    });
    fillable
}

fn draw_geometry(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    geometry: &Geometry,
    style: &LayerStyle,
) {
    let fillable = trace(ctx, vp, geometry);
    if fillable && style.fill_alpha > 0.0 {
        ctx.set_fill_style_str(&colors::rgba_css(style.fill, style.fill_alpha));
        // Even-odd so polygon holes stay empty.
        ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
    }
    set_dash(ctx, style.dash);
    ctx.set_line_width(style.line_width);
    ctx.set_stroke_style_str(&colors::rgba_css(style.stroke, style.stroke_alpha));
    ctx.stroke();
}

fn draw_marker(ctx: &CanvasRenderingContext2d, vp: &Viewport, at: LatLng) {
    let (x, y) = vp.latlng_to_screen(at);
    let head_y = y - MARKER_HEIGHT_PX + MARKER_HEAD_RADIUS_PX;
    set_dash(ctx, &[]);

    ctx.begin_path();
    ctx.move_to(x, y);
    ctx.arc(x, head_y, MARKER_HEAD_RADIUS_PX, FRAC_PI_4 * 3.0, FRAC_PI_4)
        .ok();
    ctx.close_path();
    ctx.set_fill_style_str(colors::MARKER_FILL);
    ctx.fill();
    ctx.set_line_width(1.5);
    ctx.set_stroke_style_str("#ffffff");
    ctx.stroke();

    ctx.begin_path();
    ctx.arc(x, head_y, MARKER_HEAD_RADIUS_PX * 0.4, 0.0, TAU).ok();
    ctx.set_fill_style_str("#ffffff");
    ctx.fill();
}

fn marker_hit(vp: &Viewport, at: LatLng, x: f64, y: f64) -> bool {
    let (mx, my) = vp.latlng_to_screen(at);
    let head_y = my - MARKER_HEIGHT_PX + MARKER_HEAD_RADIUS_PX;
    (x - mx).abs() <= MARKER_HEAD_RADIUS_PX && y >= head_y - MARKER_HEAD_RADIUS_PX && y <= my
}

/// Map area: status while the territory loads, the canvas and its overlays
/// once it is ready.
#[component]
pub fn MapView() -> impl IntoView {
    let TerritoryLoad(load_state) = expect_context();
    let OpenModal(open_modal) = expect_context();
    provide_context(Popup(RwSignal::new(None)));

    view! {
        <section style="display: flex; flex-direction: column; flex: 1; min-height: 0; padding: 0.75rem 1rem; gap: 0.5rem;">
            <div style="display: flex; align-items: center; justify-content: space-between;">
                <h2 class="premium-title" style="margin: 0;">"Territorio SIAMsoft"</h2>
                <button class="btn-contact" on:click=move |_| open_modal.set(Some(ActiveModal::Contact))>
                    <span>"✉️"</span>
                    " Contactar"
                </button>
            </div>
            {move || match load_state.get() {
                LoadState::Loading => view! {
                    <div class="map-status">
                        "Cargando mapa del territorio..."
                        <br />
                        <small>"(Verifique que el backend esté corriendo)"</small>
                    </div>
                }
                .into_any(),
                LoadState::Failed(message) => view! {
                    <div class="map-status map-error">
                        {format!("Error: {message}")}
                        <br />
                        <small>"Intente recargar la página"</small>
                    </div>
                }
                .into_any(),
                LoadState::Ready => view! {
                    <div class="map-container" style="flex: 1; position: relative; overflow: hidden; border-radius: 12px; min-height: 320px;">
                        <MapCanvas />
                        <SelectionLabel />
                        <MapPopup />
                        <MapSearch />
                        <LayerToggles />
                        <OfficeButton />
                        <Tooltip />
                    </div>
                }
                .into_any(),
            }}
        </section>
    }
}

#[component]
fn MapCanvas() -> impl IntoView {
    let Territory(territory) = expect_context();
    let Boundary(boundary) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let Hovered(hovered) = expect_context();
    let Selected(selected) = expect_context();
    let MousePos(mouse_pos) = expect_context();
    let Layers(layers) = expect_context();
    let MapCommands(commands) = expect_context();
    let Company(company) = expect_context();
    let Popup(popup) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    let pinch_dist = Rc::new(Cell::new(0.0f64));
    // CSS size of the canvas at the last paint; zero until the first one.
    let canvas_size = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let flight: Rc<RefCell<Option<Flight>>> = Rc::new(RefCell::new(None));
    let bounds_cache = Rc::new(RefCell::new(BoundsCache::default()));
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let canvas_size_render = canvas_size.clone();
    let flight_render = flight.clone();
    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return false;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return false;
        };
        let w = parent.client_width() as f64;
        let h = parent.client_height() as f64;
        if w <= 0.0 || h <= 0.0 {
            return false;
        }
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        let pw = (w * dpr).round().max(1.0) as u32;
        let ph = (h * dpr).round().max(1.0) as u32;
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
            // Resizing resets the context state.
            cached_ctx.borrow_mut().take();
        }

        let first_frame = canvas_size_render.get() == (0.0, 0.0);
        canvas_size_render.set((w, h));
        let mut vp = viewport.get_untracked();
        let mut moved = false;
        if first_frame {
            vp = Viewport::initial(w, h);
            moved = true;
        }

        // Fit once per territory snapshot.
        if let Some(sets) = territory.get_untracked() {
            let mut cache = bounds_cache.borrow_mut();
            let computed_before = cache.computations();
            let bounds = cache.get(&sets);
            if cache.computations() != computed_before
                && let Some(bounds) = bounds
            {
                vp.fit_bounds(&bounds, w, h, FIT_PADDING_PX, MAX_ZOOM);
                vp.clamp_to(&viewport::max_bounds(), w, h);
                moved = true;
            }
        }

        let mut animating = false;
        let mut landed = false;
        if let Some(f) = flight_render.borrow().as_ref() {
            let t = (js_sys::Date::now() - f.started_at) / f.duration_ms;
            vp = viewport::interpolate(&f.from, &f.to, t, w, h);
            moved = true;
            animating = t < 1.0;
            landed = !animating;
        }
        if landed {
            flight_render.borrow_mut().take();
        }
        if moved {
            viewport.set(vp.clone());
        }

        let Some(ctx) = context_2d(canvas, &cached_ctx) else {
            return animating;
        };
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
        ctx.set_line_join("round");
        ctx.set_fill_style_str(colors::MAP_BACKGROUND);
        ctx.fill_rect(0.0, 0.0, w, h);

        if let Some(outline) = boundary.get_untracked() {
            draw_geometry(&ctx, &vp, &outline, &colors::BOUNDARY_GLOW);
            draw_geometry(&ctx, &vp, &outline, &colors::BOUNDARY_LINE);
        }

        let visible = layers.get_untracked();
        let hot = hovered.get_untracked();
        if let Some(sets) = territory.get_untracked() {
            let on_screen = visible_bounds(&vp, w, h);
            for kind in DRAW_ORDER {
                if !visible.shows(kind) {
                    continue;
                }
                let style = colors::layer_style(kind, false);
                for (index, entity) in sets.layer(kind).iter().enumerate() {
                    if hot == Some(RegionRef { kind, index })
                        || !entity.bounds.is_some_and(|b| overlaps(&b, &on_screen))
                    {
                        continue;
                    }
                    draw_geometry(&ctx, &vp, &entity.geometry, &style);
                }
            }
            // Hovered region on top of its tier.
            if let Some(r) = hot
                && visible.shows(r.kind)
                && let Some(entity) = sets.get(r.kind, r.index)
            {
                draw_geometry(&ctx, &vp, &entity.geometry, &colors::layer_style(r.kind, true));
            }
            if let Some(r) = selected.get_untracked()
                && let Some(entity) = sets.get(r.kind, r.index)
            {
                draw_geometry(&ctx, &vp, &entity.geometry, &colors::SELECTED);
            }
        }

        if let Some(location) = company.with_untracked(|c| c.location) {
            draw_marker(&ctx, &vp, location);
        }

        animating
    });
    let scheduler = Rc::new(scheduler);

    let sched_data = scheduler.clone();
    Effect::new(move || {
        territory.track();
        boundary.track();
        layers.track();
        hovered.track();
        selected.track();
        company.track();
        sched_data.mark_dirty();
    });

    let sched_vp = scheduler.clone();
    Effect::new(move || {
        viewport.track();
        sched_vp.mark_dirty();
    });

    let sched_resize = scheduler.clone();
    let resize_handle = window_event_listener(leptos::ev::resize, move |_| {
        sched_resize.mark_dirty();
    });
    on_cleanup(move || resize_handle.remove());

    // Camera commands from search and the office button.
    let sched_cmd = scheduler.clone();
    let flight_cmd = flight.clone();
    let canvas_size_cmd = canvas_size.clone();
    Effect::new(move || {
        let Some(command) = commands.get() else {
            return;
        };
        commands.set(None);
        let (w, h) = canvas_size_cmd.get();
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let from = viewport.get_untracked();
        let mut to = from.clone();
        let duration_ms = match command {
            MapCommand::FitRegion(r) => {
                let bounds = territory.with_untracked(|t| {
                    t.as_ref()
                        .and_then(|sets| sets.get(r.kind, r.index))
                        .and_then(|entity| entity.bounds)
                });
                let Some(bounds) = bounds else {
                    return;
                };
                to.fit_bounds(&bounds, w, h, FIT_PADDING_PX, SEARCH_MAX_ZOOM);
                FIT_DURATION_MS
            }
            MapCommand::FlyTo { center, zoom } => {
                to.center_on(center, zoom, w, h);
                FLY_DURATION_MS
            }
        };
        to.clamp_to(&viewport::max_bounds(), w, h);
        *flight_cmd.borrow_mut() = Some(Flight {
            from,
            to,
            started_at: js_sys::Date::now(),
            duration_ms,
        });
        sched_cmd.mark_dirty();
    });

    let local_point = move |client_x: f64, client_y: f64| {
        canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            })
            .unwrap_or((client_x, client_y))
    };

    // --- Input handlers ---

    let on_wheel = {
        let flight = flight.clone();
        let canvas_size = canvas_size.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            flight.borrow_mut().take();
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            let (w, h) = canvas_size.get();
            let delta = e.delta_y();
            viewport.update(|vp| {
                vp.zoom_at(delta, x, y);
                vp.clamp_to(&viewport::max_bounds(), w, h);
            });
        }
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let flight = flight.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            flight.borrow_mut().take();
            hovered.set(None);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let canvas_size = canvas_size.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                let (w, h) = canvas_size.get();
                viewport.update(|vp| {
                    vp.pan(dx, dy);
                    vp.clamp_to(&viewport::max_bounds(), w, h);
                });
            } else {
                let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
                let point = viewport.with_untracked(|vp| vp.screen_to_latlng(x, y));
                let visible = layers.get_untracked();
                let hit = territory
                    .with_untracked(|t| t.as_ref().and_then(|sets| hit_test(sets, visible, point)));
                if hit != hovered.get_untracked() {
                    hovered.set(hit);
                }
                if hit.is_some() {
                    mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
                }
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            let vp = viewport.get_untracked();

            if let Some(office) = company.with_untracked(|c| c.location)
                && marker_hit(&vp, office, x, y)
            {
                popup.set(Some((PopupTarget::Office, office)));
                return;
            }

            let point = vp.screen_to_latlng(x, y);
            let visible = layers.get_untracked();
            let target = territory.with_untracked(|t| {
                let sets = t.as_ref()?;
                let hit = hit_test(sets, visible, point)?;
                entity_caption(sets.get(hit.kind, hit.index)?).map(|_| hit)
            });
            popup.set(target.map(|hit| (PopupTarget::Region(hit), point)));
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        let canvas_size = canvas_size.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let (mid_x, mid_y) = local_point(
                        (t0.client_x() + t1.client_x()) as f64 / 2.0,
                        (t0.client_y() + t1.client_y()) as f64 / 2.0,
                    );
                    let delta = -(new_dist - old_dist) * 2.0;
                    let (w, h) = canvas_size.get();
                    viewport.update(|vp| {
                        vp.zoom_at(delta, mid_x, mid_y);
                        vp.clamp_to(&viewport::max_bounds(), w, h);
                    });
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

/// Screen position of `at`, following the viewport.
fn anchored(viewport: RwSignal<Viewport>, at: LatLng) -> (f64, f64) {
    viewport.with(|vp| vp.latlng_to_screen(at))
}

/// Hover tooltip following the pointer.
#[component]
fn Tooltip() -> impl IntoView {
    let Territory(territory) = expect_context();
    let Hovered(hovered) = expect_context();
    let MousePos(mouse_pos) = expect_context();

    move || {
        let target = hovered.get()?;
        let lines = territory.with(|t| {
            t.as_ref()
                .and_then(|sets| sets.get(target.kind, target.index))
                .map(tooltip_lines)
        })?;
        let (x, y) = mouse_pos.get();
        let mut lines = lines.into_iter();
        let title = lines.next().unwrap_or_default();
        Some(view! {
            <div
                class="map-tooltip"
                style=format!(
                    "position: fixed; left: {}px; top: {}px; pointer-events: none; z-index: 30;",
                    x + 14.0,
                    y + 14.0,
                )
            >
                <strong>{title}</strong>
                {lines.map(|line| view! { <div>{line}</div> }).collect_view()}
            </div>
        })
    }
}

/// Permanent label at the center of the search selection.
#[component]
fn SelectionLabel() -> impl IntoView {
    let Territory(territory) = expect_context();
    let Selected(selected) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    move || {
        let target = selected.get()?;
        let (name, kind, code, center) = territory.with(|t| {
            let entity = t.as_ref()?.get(target.kind, target.index)?;
            Some((
                entity.name.clone(),
                entity.kind.label().to_lowercase(),
                entity.code.clone().unwrap_or_default(),
                entity.bounds?.center(),
            ))
        })?;
        let (x, y) = anchored(viewport, center);
        Some(view! {
            <div
                class="selection-label"
                style=format!(
                    "position: absolute; left: {x}px; top: {y}px; transform: translate(-50%, -50%); pointer-events: none; z-index: 10;",
                )
            >
                <strong>{name}</strong>
                <div>{kind}</div>
                <div>{code}</div>
            </div>
        })
    }
}

#[component]
fn MapPopup() -> impl IntoView {
    let Territory(territory) = expect_context();
    let Company(company) = expect_context();
    let Popup(popup) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    move || {
        let (target, at) = popup.get()?;
        let body = match target {
            PopupTarget::Region(r) => {
                let caption = territory.with(|t| {
                    t.as_ref()
                        .and_then(|sets| sets.get(r.kind, r.index))
                        .and_then(entity_caption)
                })?;
                view! { <div style="text-align: center; font-weight: bold;">{caption}</div> }
                    .into_any()
            }
            PopupTarget::Office => {
                let profile = company.get();
                let directions = profile.directions_url();
                view! {
                    <div style="text-align: center;">
                        <strong>{profile.name.clone()}</strong>
                        <div style="font-size: 0.8rem; color: #64748b;">{profile.subtitle.clone()}</div>
                        {directions.map(|href| view! {
                            <a class="btn-directions" href=href target="_blank" rel="noopener noreferrer">
                                "Cómo llegar"
                            </a>
                        })}
                    </div>
                }
                .into_any()
            }
        };
        let (x, y) = anchored(viewport, at);
        Some(view! {
            <div
                class="map-popup"
                style=format!(
                    "position: absolute; left: {x}px; top: {}px; transform: translate(-50%, -100%); z-index: 20;",
                    y - 12.0,
                )
            >
                <button class="popup-close" title="Cerrar" on:click=move |_| popup.set(None)>"×"</button>
                {body}
            </div>
        })
    }
}

#[component]
fn LayerToggles() -> impl IntoView {
    let Layers(layers) = expect_context();
    let Hovered(hovered) = expect_context();

    let entries = [
        (RegionKind::Department, "Departamentos"),
        (RegionKind::Province, "Provincias"),
        (RegionKind::District, "Municipalidades con SIAMsoft"),
    ];

    view! {
        <div class="layer-toggles" style="position: absolute; top: 12px; right: 12px; z-index: 15;">
            {entries
                .into_iter()
                .map(|(kind, label)| view! {
                    <label style="display: flex; align-items: center; gap: 6px; cursor: pointer;">
                        <input
                            type="checkbox"
                            prop:checked=move || layers.with(|l| l.shows(kind))
                            on:change=move |_| {
                                layers.update(|l| l.toggle(kind));
                                hovered.set(None);
                            }
                        />
                        {label}
                    </label>
                })
                .collect_view()}
        </div>
    }
}

/// Fly to the head office once the company location is known.
#[component]
fn OfficeButton() -> impl IntoView {
    let Company(company) = expect_context();
    let MapCommands(commands) = expect_context();

    move || {
        let center = company.with(|c| c.location)?;
        Some(view! {
            <button
                class="btn-office"
                title="Ir a la Sede Central"
                style="position: absolute; bottom: 16px; left: 16px; z-index: 15;"
                on:click=move |_| commands.set(Some(MapCommand::FlyTo { center, zoom: OFFICE_ZOOM }))
            >
                "🏢 Oficina principal SIAMsoft"
            </button>
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use siam_shared::aggregate_json;

    fn square(x0: f64, y0: f64, size: f64) -> String {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]
            ]]
        })
        .to_string()
    }

    fn nested_sets() -> TerritorySets {
        aggregate_json(&json!([{
            "geo_dep_json": square(-80.0, -15.0, 10.0),
            "geo_pro_json": square(-80.0, -15.0, 5.0),
            "geo_dis_json": square(-80.0, -15.0, 2.0),
            "des_dep": "Lima",
            "des_pro": "Huaral",
            "nom_distrito": "Chancay",
            "cod_ubi": "150605",
            "cod_eje": "0042",
            "nom_eje": "Municipalidad Distrital de Chancay",
        }]))
    }

    #[test]
    fn hit_test_prefers_the_innermost_visible_tier() {
        let sets = nested_sets();
        let all = VisibleLayers::default();
        let inside_all = LatLng::new(-14.0, -79.0);

        let hit = hit_test(&sets, all, inside_all);
        assert_eq!(hit.map(|r| r.kind), Some(RegionKind::District));

        let no_districts = VisibleLayers {
            districts: false,
            ..all
        };
        let hit = hit_test(&sets, no_districts, inside_all);
        assert_eq!(hit.map(|r| r.kind), Some(RegionKind::Province));

        let only_departments = LatLng::new(-7.0, -72.0);
        let hit = hit_test(&sets, all, only_departments);
        assert_eq!(hit.map(|r| r.kind), Some(RegionKind::Department));
    }

    #[test]
    fn hit_test_misses_outside_and_on_hidden_layers() {
        let sets = nested_sets();
        assert_eq!(hit_test(&sets, VisibleLayers::default(), LatLng::new(0.0, 0.0)), None);

        let none = VisibleLayers {
            departments: false,
            provinces: false,
            districts: false,
        };
        assert_eq!(hit_test(&sets, none, LatLng::new(-14.0, -79.0)), None);
    }

    #[test]
    fn district_tooltip_names_municipality_and_parents() {
        let sets = nested_sets();
        let lines = tooltip_lines(&sets.districts[0]);
        assert_eq!(
            lines,
            vec![
                "Territorio SIAMsoft",
                "Municipalidad de Chancay",
                "Departamento: Lima",
                "Provincia: Huaral",
                "Ubigeo: 150605",
            ]
        );
    }

    #[test]
    fn province_tooltip_shows_parent_department() {
        let sets = nested_sets();
        let lines = tooltip_lines(&sets.provinces[0]);
        assert_eq!(lines, vec!["Huaral", "Provincia de: Lima", "Ubigeo: 1506"]);
    }

    #[test]
    fn only_districts_with_an_entity_get_a_caption() {
        let sets = nested_sets();
        assert_eq!(
            entity_caption(&sets.districts[0]).as_deref(),
            Some("0042 - Municipalidad Distrital de Chancay")
        );
        assert_eq!(entity_caption(&sets.departments[0]), None);

        let mut bare = sets.districts[0].clone();
        bare.entity_code = None;
        bare.entity_name = None;
        assert_eq!(entity_caption(&bare), None);
    }

    #[test]
    fn overlap_is_inclusive_and_rejects_disjoint_boxes() {
        let a = Bounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
        let touching = Bounds::new(LatLng::new(1.0, 1.0), LatLng::new(2.0, 2.0));
        let far = Bounds::new(LatLng::new(5.0, 5.0), LatLng::new(6.0, 6.0));
        assert!(overlaps(&a, &touching));
        assert!(!overlaps(&a, &far));
    }
}
