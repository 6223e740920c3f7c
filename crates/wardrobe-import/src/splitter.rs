//! Texture separation for GLB containers
//!
//! Every image of a container is pulled out as a standalone resource and the
//! image entry is rewritten to reference it by `uri`. Buffer views that only
//! carried image bytes are dropped and the binary chunk is repacked, so the
//! rewritten container holds geometry and animation data only.

use crate::types::{ExtractedResource, SplitContainer, TextureNaming};
use base64::Engine;
use gltf::binary::{Glb, Header};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::debug;
use wardrobe_core::{identify, ContentId, Result, WardrobeError};

/// Split the textures out of a GLB container.
///
/// `resource_dir` is where external `uri` references are resolved. A
/// container without images whose buffers all live inside it is returned
/// untouched. Buffers that point at external files are embedded into the
/// rewritten BIN chunk so the container never references a file it does
/// not ship with.
pub fn split_textures(
    container: &[u8],
    resource_dir: &Path,
    naming: TextureNaming,
) -> Result<SplitContainer> {
    split_with(container, resource_dir, &mut Namer::new(naming))
}

fn split_with(container: &[u8], resource_dir: &Path, namer: &mut Namer) -> Result<SplitContainer> {
    let glb = Glb::from_slice(container)
        .map_err(|e| WardrobeError::InvalidContainer(format!("not a GLB container: {}", e)))?;
    let mut json: Value = serde_json::from_slice(glb.json.as_ref()).map_err(|e| {
        WardrobeError::InvalidContainer(format!("malformed glTF JSON chunk: {}", e))
    })?;
    let bin: Vec<u8> = glb.bin.map(Cow::into_owned).unwrap_or_default();

    let image_count = json
        .get("images")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let external_buffers = has_external_buffers(&json);
    if image_count == 0 && !external_buffers {
        return Ok(SplitContainer {
            container: container.to_vec(),
            resources: Vec::new(),
        });
    }

    let mut resources = Vec::new();
    let mut image_views = BTreeSet::new();
    let mut changed = external_buffers;

    for index in 0..image_count {
        let source = read_image(&json, index, &bin, resource_dir)?;
        let (name, is_new) = namer.assign(index, &source);

        if let Some(view) = source.view {
            image_views.insert(view);
        }
        if source.original_uri.as_deref() != Some(name.as_str()) {
            changed = true;
        }

        if let Some(image) = json
            .get_mut("images")
            .and_then(|images| images.get_mut(index))
            .and_then(Value::as_object_mut)
        {
            image.remove("bufferView");
            image.insert("uri".to_string(), Value::String(name.clone()));
        }

        if is_new {
            debug!(image = index, file = %name, bytes = source.bytes.len(), "extracted texture");
            resources.push(ExtractedResource {
                file_name: name,
                buffer: source.bytes,
            });
        }
    }

    if !changed {
        return Ok(SplitContainer {
            container: container.to_vec(),
            resources,
        });
    }

    let mut referenced = BTreeSet::new();
    collect_view_refs(&json, &mut referenced);
    let removed: BTreeSet<usize> = image_views.difference(&referenced).copied().collect();

    let bin = repack_buffers(&mut json, &removed, &bin, resource_dir)?;
    let container = write_glb(&json, (!bin.is_empty()).then_some(bin.as_slice()))?;
    Ok(SplitContainer {
        container,
        resources,
    })
}

/// Split every model of an asset.
///
/// For each model the rewritten container comes first (under the model's own
/// file name), followed by its new textures. Texture names are assigned
/// across all models together: a texture already produced by an earlier
/// model is referenced under its existing name, and a different texture that
/// would take an existing name gets an index suffix instead. `reserved`
/// names are never given to a texture.
pub fn split_asset_models<P: AsRef<Path>>(
    models: &[P],
    naming: TextureNaming,
    reserved: &[&str],
) -> Result<Vec<ExtractedResource>> {
    let mut namer = Namer::new(naming);
    for name in reserved {
        namer.reserve(name);
    }

    let mut targets = Vec::with_capacity(models.len());
    for model in models {
        let path = model.as_ref();
        if !path.is_file() {
            return Err(WardrobeError::MissingResource(path.display().to_string()));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WardrobeError::InvalidContainer(format!("unusable file name: {}", path.display()))
            })?
            .to_string();
        namer.reserve(&file_name);
        targets.push((path, file_name));
    }

    let mut files: Vec<ExtractedResource> = Vec::new();
    for (path, file_name) in targets {
        let bytes = std::fs::read(path)?;
        let resource_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let split = split_with(&bytes, resource_dir, &mut namer)?;

        push_file(
            &mut files,
            ExtractedResource {
                file_name,
                buffer: split.container,
            },
        )?;
        for resource in split.resources {
            push_file(&mut files, resource)?;
        }
    }

    Ok(files)
}

/// Assemble a GLB container from a glTF JSON document and an optional BIN chunk
pub fn write_glb(json: &Value, bin: Option<&[u8]>) -> Result<Vec<u8>> {
    let json_bytes = serde_json::to_vec(json)?;
    let glb = Glb {
        header: Header {
            magic: *b"glTF",
            version: 2,
            length: 0,
        },
        json: Cow::Owned(json_bytes),
        bin: bin.map(Cow::Borrowed),
    };

    let mut out = Vec::new();
    glb.to_writer(&mut out)
        .map_err(|e| WardrobeError::InvalidContainer(format!("failed to write GLB: {}", e)))?;
    Ok(out)
}

fn push_file(files: &mut Vec<ExtractedResource>, file: ExtractedResource) -> Result<()> {
    if files.iter().any(|f| f.file_name == file.file_name) {
        return Err(WardrobeError::InvalidContainer(format!(
            "two files of the asset are named '{}'",
            file.file_name
        )));
    }
    files.push(file);
    Ok(())
}

/// The bytes behind one image entry, and what naming can draw on
struct ImageSource {
    bytes: Vec<u8>,
    stem: Option<String>,
    extension: Option<String>,
    view: Option<usize>,
    original_uri: Option<String>,
}

fn read_image(json: &Value, index: usize, bin: &[u8], resource_dir: &Path) -> Result<ImageSource> {
    let image = json
        .get("images")
        .and_then(|images| images.get(index))
        .ok_or_else(|| WardrobeError::InvalidContainer(format!("image {} missing", index)))?;

    let name_stem = image
        .get("name")
        .and_then(Value::as_str)
        .and_then(sanitize_stem);
    let mime = image.get("mimeType").and_then(Value::as_str);

    if let Some(view) = image.get("bufferView").and_then(Value::as_u64) {
        let view = view as usize;
        return Ok(ImageSource {
            bytes: read_buffer_view(json, view, bin, resource_dir)?,
            stem: name_stem,
            extension: mime.and_then(extension_for_mime).map(String::from),
            view: Some(view),
            original_uri: None,
        });
    }

    let uri = image.get("uri").and_then(Value::as_str).ok_or_else(|| {
        WardrobeError::InvalidContainer(format!("image {} has neither bufferView nor uri", index))
    })?;

    if let Some(rest) = uri.strip_prefix("data:") {
        let data_mime = rest.split(';').next().filter(|m| !m.is_empty());
        return Ok(ImageSource {
            bytes: decode_data_uri(uri)?,
            stem: name_stem,
            extension: mime
                .or(data_mime)
                .and_then(extension_for_mime)
                .map(String::from),
            view: None,
            original_uri: None,
        });
    }

    let path = Path::new(uri);
    Ok(ImageSource {
        bytes: read_external(uri, resource_dir)?,
        stem: name_stem.or_else(|| path.file_stem().and_then(|s| s.to_str()).and_then(sanitize_stem)),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .or_else(|| mime.and_then(extension_for_mime).map(String::from)),
        view: None,
        original_uri: Some(uri.to_string()),
    })
}

fn read_buffer_view(json: &Value, view_index: usize, bin: &[u8], resource_dir: &Path) -> Result<Vec<u8>> {
    let view = json
        .get("bufferViews")
        .and_then(|views| views.get(view_index))
        .ok_or_else(|| {
            WardrobeError::InvalidContainer(format!("bufferView {} does not exist", view_index))
        })?;
    let buffer_index = view.get("buffer").and_then(Value::as_u64).ok_or_else(|| {
        WardrobeError::InvalidContainer(format!("bufferView {} has no buffer", view_index))
    })? as usize;
    let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let length = view.get("byteLength").and_then(Value::as_u64).unwrap_or(0) as usize;

    let buffer = buffer_bytes(json, buffer_index, bin, resource_dir)?;
    offset
        .checked_add(length)
        .and_then(|end| buffer.get(offset..end))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| {
            WardrobeError::InvalidContainer(format!(
                "bufferView {} exceeds buffer {} ({} bytes)",
                view_index,
                buffer_index,
                buffer.len()
            ))
        })
}

fn buffer_bytes<'a>(
    json: &Value,
    index: usize,
    bin: &'a [u8],
    resource_dir: &Path,
) -> Result<Cow<'a, [u8]>> {
    let buffer = json
        .get("buffers")
        .and_then(|buffers| buffers.get(index))
        .ok_or_else(|| WardrobeError::InvalidContainer(format!("buffer {} does not exist", index)))?;

    match buffer.get("uri").and_then(Value::as_str) {
        None if index == 0 => Ok(Cow::Borrowed(bin)),
        None => Err(WardrobeError::InvalidContainer(format!(
            "buffer {} has no uri",
            index
        ))),
        Some(uri) if uri.starts_with("data:") => decode_data_uri(uri).map(Cow::Owned),
        Some(uri) => read_external(uri, resource_dir).map(Cow::Owned),
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (_, payload) = uri.split_once(";base64,").ok_or_else(|| {
        WardrobeError::InvalidContainer("only base64 data URIs are supported".to_string())
    })?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| WardrobeError::InvalidContainer(format!("bad base64 data URI: {}", e)))
}

fn read_external(uri: &str, resource_dir: &Path) -> Result<Vec<u8>> {
    let path = resource_dir.join(uri);
    if !path.is_file() {
        return Err(WardrobeError::MissingResource(path.display().to_string()));
    }
    Ok(std::fs::read(&path)?)
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/ktx2" => Some("ktx2"),
        _ => None,
    }
}

/// Last path segment of a name, without a known image extension
fn sanitize_stem(name: &str) -> Option<String> {
    let segment = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let stem = match segment.rsplit_once('.') {
        Some((stem, ext))
            if matches!(
                ext.to_ascii_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "webp" | "ktx2"
            ) =>
        {
            stem
        }
        _ => segment,
    };
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Assigns final names, unique per container
struct Namer {
    naming: TextureNaming,
    taken: HashSet<String>,
    by_content: HashMap<ContentId, String>,
}

impl Namer {
    fn new(naming: TextureNaming) -> Self {
        Self {
            naming,
            taken: HashSet::new(),
            by_content: HashMap::new(),
        }
    }

    /// Keep `name` from ever being assigned
    fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Returns the name for this image and whether it names a new resource
    fn assign(&mut self, index: usize, source: &ImageSource) -> (String, bool) {
        let cid = identify(&source.bytes);
        if let Some(existing) = self.by_content.get(&cid) {
            return (existing.clone(), false);
        }

        let name = match self.naming {
            TextureNaming::ContentHash => cid.to_string(),
            TextureNaming::RelativePath => self.relative_name(index, source),
        };
        self.taken.insert(name.clone());
        self.by_content.insert(cid, name.clone());
        (name, true)
    }

    fn relative_name(&self, index: usize, source: &ImageSource) -> String {
        let stem = source
            .stem
            .clone()
            .unwrap_or_else(|| format!("image{}", index));
        let ext = source.extension.as_deref().unwrap_or("bin");

        let mut candidate = format!("{}.{}", stem, ext);
        let mut attempt = 0;
        while self.taken.contains(&candidate) {
            attempt += 1;
            candidate = if attempt == 1 {
                format!("{}_{}.{}", stem, index, ext)
            } else {
                format!("{}_{}_{}.{}", stem, index, attempt, ext)
            };
        }
        candidate
    }
}

fn collect_view_refs(value: &Value, out: &mut BTreeSet<usize>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "bufferView" {
                    if let Some(index) = child.as_u64() {
                        out.insert(index as usize);
                    }
                } else {
                    collect_view_refs(child, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_view_refs(item, out)),
        _ => {}
    }
}

fn renumber_view_refs(value: &mut Value, remap: &HashMap<usize, usize>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "bufferView" {
                    if let Some(new) = child.as_u64().and_then(|old| remap.get(&(old as usize))) {
                        *child = Value::from(*new as u64);
                    }
                } else {
                    renumber_view_refs(child, remap);
                }
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| renumber_view_refs(item, remap)),
        _ => {}
    }
}

fn has_external_buffers(json: &Value) -> bool {
    json.get("buffers")
        .and_then(Value::as_array)
        .is_some_and(|buffers| {
            buffers.iter().any(|buffer| {
                buffer
                    .get("uri")
                    .and_then(Value::as_str)
                    .is_some_and(|uri| !uri.starts_with("data:"))
            })
        })
}

/// Drop `removed` buffer views and pack every remaining view, whatever buffer
/// it came from, 4-byte aligned into a single GLB buffer. View and buffer
/// references are renumbered; the buffer list goes away when no view is
/// left. Returns the new BIN chunk.
fn repack_buffers(
    json: &mut Value,
    removed: &BTreeSet<usize>,
    bin: &[u8],
    resource_dir: &Path,
) -> Result<Vec<u8>> {
    let views = match json.get_mut("bufferViews").map(Value::take) {
        Some(Value::Array(views)) => views,
        _ => Vec::new(),
    };

    let mut sources: HashMap<usize, Cow<'_, [u8]>> = HashMap::new();
    let mut remap = HashMap::new();
    let mut kept = Vec::with_capacity(views.len());
    let mut packed = Vec::with_capacity(bin.len());

    for (old, mut view) in views.into_iter().enumerate() {
        if removed.contains(&old) {
            continue;
        }
        let buffer_index = view.get("buffer").and_then(Value::as_u64).ok_or_else(|| {
            WardrobeError::InvalidContainer(format!("bufferView {} has no buffer", old))
        })? as usize;
        if !sources.contains_key(&buffer_index) {
            let bytes = buffer_bytes(json, buffer_index, bin, resource_dir)?;
            sources.insert(buffer_index, bytes);
        }
        let source: &[u8] = &sources[&buffer_index];

        let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let length = view.get("byteLength").and_then(Value::as_u64).unwrap_or(0) as usize;
        let bytes = offset
            .checked_add(length)
            .and_then(|end| source.get(offset..end))
            .ok_or_else(|| {
                WardrobeError::InvalidContainer(format!(
                    "bufferView {} exceeds buffer {}",
                    old, buffer_index
                ))
            })?;

        while packed.len() % 4 != 0 {
            packed.push(0);
        }
        view["buffer"] = Value::from(0u64);
        view["byteOffset"] = Value::from(packed.len() as u64);
        packed.extend_from_slice(bytes);

        remap.insert(old, kept.len());
        kept.push(view);
    }
    while packed.len() % 4 != 0 {
        packed.push(0);
    }

    let Some(root) = json.as_object_mut() else {
        return Err(WardrobeError::InvalidContainer("glTF root is not an object".to_string()));
    };
    if kept.is_empty() {
        root.remove("bufferViews");
        root.remove("buffers");
        packed.clear();
    } else {
        root.insert("bufferViews".to_string(), Value::Array(kept));
        let mut buffer = serde_json::Map::new();
        buffer.insert("byteLength".to_string(), Value::from(packed.len() as u64));
        root.insert("buffers".to_string(), Value::Array(vec![Value::Object(buffer)]));
    }

    renumber_view_refs(json, &remap);
    Ok(packed)
}
