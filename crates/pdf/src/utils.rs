use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

/// 从数组对象中提取边界框坐标
fn extract_box_values(arr: &[Object]) -> Option<(f32, f32, f32, f32)> {
    let values: Vec<f32> = arr.iter().filter_map(get_number).collect();
    if values.len() == 4 {
        Some((values[0], values[1], values[2], values[3]))
    } else {
        None
    }
}

/// 解引用：引用对象返回目标对象，其它原样返回
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// 沿 Parent 链查找可继承的页面属性（MediaBox、CropBox、Resources）
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // 页面树深度有限，防止循环引用
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        current = resolve_dict(doc, current.get(b"Parent").ok()?)?;
    }
    None
}

/// 获取页面的有效边界框（优先使用 CropBox，否则使用 MediaBox）
/// 返回 (llx, lly, urx, ury)
pub fn get_media_box(doc: &Document, page_id: ObjectId) -> (f32, f32, f32, f32) {
    for key in [&b"CropBox"[..], &b"MediaBox"[..]] {
        if let Some(Object::Array(arr)) = inherited(doc, page_id, key) {
            if let Some(values) = extract_box_values(arr) {
                log::debug!(
                    "[MediaBox] 使用 {}: {:?}",
                    String::from_utf8_lossy(key),
                    values
                );
                return values;
            }
        }
    }

    log::warn!("[MediaBox] 使用默认 Letter 尺寸");
    (0.0, 0.0, 612.0, 792.0)
}

/// 从 Object 获取数值
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// 获取流内容（支持压缩和未压缩的流）
pub fn get_stream_content(stream: &Stream) -> Vec<u8> {
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    }
}

/// 获取页面的内容流数据
pub fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let dict = doc.get_dictionary(page_id).map_err(|e| e.to_string())?;
    let contents = dict
        .get(b"Contents")
        .map_err(|_| "页面没有内容流".to_string())?;

    match resolve(doc, contents) {
        Some(Object::Stream(stream)) => Ok(get_stream_content(stream)),
        Some(Object::Array(arr)) => {
            let mut all_content = Vec::new();
            for item in arr {
                if let Some(Object::Stream(stream)) = resolve(doc, item) {
                    all_content.extend(get_stream_content(stream));
                    all_content.push(b'\n');
                }
            }
            Ok(all_content)
        }
        _ => Err("无法获取页面内容".to_string()),
    }
}

/// 页面字体资源：资源名 → BaseFont
pub fn page_fonts(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, String> {
    let mut fonts = BTreeMap::new();
    let Some(resources) = inherited(doc, page_id, b"Resources") else {
        return fonts;
    };
    let Some(font_dict) = resolve_dict(doc, resources)
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve_dict(doc, f))
    else {
        return fonts;
    };

    for (name, value) in font_dict.iter() {
        let base_font = resolve_dict(doc, value)
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|base| match base {
                Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
                _ => None,
            });
        if let Some(base_font) = base_font {
            fonts.insert(name.clone(), base_font);
        }
    }
    fonts
}
