use leptos::prelude::*;
use wasm_bindgen::JsCast;

use siam_shared::search::{SearchHit, SearchIndex};

use crate::app::{MapCommand, MapCommands, RegionRef, Selected, Territory};

/// Region search over the loaded territory. Picking a result selects the
/// region and fits the map to it.
#[component]
pub fn MapSearch() -> impl IntoView {
    let Territory(territory) = expect_context();
    let Selected(selected) = expect_context();
    let MapCommands(commands) = expect_context();

    let index = StoredValue::new(SearchIndex::default());
    let query = RwSignal::new(String::new());
    let results: RwSignal<Vec<SearchHit>> = RwSignal::new(Vec::new());

    // Hits index into one snapshot; rebuild whenever it changes.
    Effect::new(move || {
        let rebuilt = territory.with(|t| t.as_deref().map(SearchIndex::build).unwrap_or_default());
        index.set_value(rebuilt);
        results.set(Vec::new());
    });

    let on_input = move |e: leptos::ev::Event| {
        let Some(input) = e
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let value = input.value();
        selected.set(None);
        results.set(index.with_value(|idx| idx.query(&value)));
        query.set(value);
    };

    let select = move |hit: SearchHit| {
        query.set(hit.name.clone());
        results.set(Vec::new());
        let target = RegionRef {
            kind: hit.kind,
            index: hit.index,
        };
        selected.set(Some(target));
        commands.set(Some(MapCommand::FitRegion(target)));
    };

    view! {
        <div class="map-search" style="position: absolute; top: 12px; left: 12px; z-index: 16; display: flex; flex-direction: column; align-items: flex-start;">
            <input
                data-search-input=""
                class="map-search-input"
                type="text"
                placeholder="Buscar Departamento, provincia, distrito o Ubigeo..."
                prop:value=move || query.get()
                on:input=on_input
                on:focus=|e| {
                    if let Some(input) = e
                        .target()
                        .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                    {
                        input.select();
                    }
                }
            />
            {move || {
                let hits = results.get();
                (!hits.is_empty()).then(|| view! {
                    <ul class="map-search-results">
                        {hits
                            .into_iter()
                            .map(|hit| {
                                let name = hit.name.clone();
                                let kind = hit.kind.label().to_lowercase();
                                let code = hit.code.clone().unwrap_or_default();
                                view! {
                                    <li on:click=move |_| select(hit.clone())>
                                        <span class="result-name">{name}</span>
                                        <div class="result-meta">
                                            <span style="text-transform: capitalize;">{kind}</span>
                                            <span class="result-code">{code}</span>
                                        </div>
                                    </li>
                                }
                            })
                            .collect_view()}
                    </ul>
                })
            }}
        </div>
    }
}
