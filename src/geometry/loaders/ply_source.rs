/// 基于 ply-rs 的 PLY 解析器
///
/// 支持 ASCII、二进制小端和二进制大端格式。文件头由 ply-rs 解析；
/// 数据逐条记录读取，每个登记过的值按文件顺序交给 [`ElementSink`]。
/// 任一时刻只持有一条记录。

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, ElementDef, Encoding, Header, Property, PropertyType};

use super::{
    ElementSink, HeaderElement, HeaderProperty, LoadResult, PlySource, Registration,
    FACE_ELEMENT, FACE_INDICES_PROPERTY, VERTEX_ELEMENT,
};
use crate::core::error::MeshLoadError;
use crate::geometry::packer::ScalarArgument;
use crate::geometry::property::{PropertySet, VertexProperty};

/// ply-rs 解析器
pub struct PlyRsSource<R: BufRead> {
    reader: R,
    parser: Parser<DefaultElement>,
    header: Option<Header>,
    elements: Vec<HeaderElement>,
}

impl PlyRsSource<BufReader<File>> {
    /// 打开 PLY 文件
    ///
    /// 文件不存在或无法读取时返回 `Io`。
    pub fn open(path: &Path) -> LoadResult<Self> {
        let file = File::open(path).map_err(|e| {
            MeshLoadError::Io(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<'a> PlyRsSource<Cursor<&'a [u8]>> {
    /// 从内存中的 PLY 文档读取
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: BufRead> PlyRsSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            parser: Parser::<DefaultElement>::new(),
            header: None,
            elements: Vec::new(),
        }
    }
}

impl<R: BufRead> PlySource for PlyRsSource<R> {
    fn read_header(&mut self) -> LoadResult<()> {
        let header = self
            .parser
            .read_header(&mut self.reader)
            .map_err(|e| MeshLoadError::Header(format!("Failed to parse PLY header: {}", e)))?;

        self.elements = header
            .elements
            .iter()
            .map(|(_, def)| HeaderElement {
                name: def.name.clone(),
                count: def.count,
                properties: def
                    .properties
                    .iter()
                    .map(|(_, prop)| HeaderProperty {
                        name: prop.name.clone(),
                        is_list: matches!(prop.data_type, PropertyType::List(..)),
                    })
                    .collect(),
            })
            .collect();
        self.header = Some(header);

        Ok(())
    }

    fn elements(&self) -> &[HeaderElement] {
        &self.elements
    }

    fn read(&mut self, registration: &Registration, sink: &mut dyn ElementSink) -> LoadResult<()> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| MeshLoadError::Parse("PLY header has not been read".to_string()))?;
        let lists = list_properties(&self.elements);
        let mut line = String::new();

        // 所有元素都要逐条读取，才能推进到后续元素的数据；每条记录读出后立即交付并释放
        for (_, element_def) in header.elements.iter() {
            for _ in 0..element_def.count {
                let record = read_record(
                    &self.parser,
                    &mut self.reader,
                    &header.encoding,
                    element_def,
                    &mut line,
                )
                .map_err(|e| {
                    MeshLoadError::Parse(format!(
                        "Failed to read PLY element '{}': {}",
                        element_def.name, e
                    ))
                })?;

                match element_def.name.as_str() {
                    VERTEX_ELEMENT if !registration.vertex.is_empty() => {
                        deliver_vertex(&record, registration.vertex, lists, sink)?;
                    }
                    FACE_ELEMENT if registration.face_indices => {
                        if let Some(property) = record.get(FACE_INDICES_PROPERTY) {
                            sink.on_face_indices(&property_as_indices(property))?;
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// 读取一条记录
///
/// ASCII 格式每条记录占一行，`line` 在记录之间复用。
fn read_record<R: BufRead>(
    parser: &Parser<DefaultElement>,
    reader: &mut R,
    encoding: &Encoding,
    element_def: &ElementDef,
    line: &mut String,
) -> io::Result<DefaultElement> {
    match encoding {
        Encoding::Ascii => {
            line.clear();
            if reader.read_line(line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ));
            }
            parser.read_ascii_element(line, element_def)
        }
        Encoding::BinaryBigEndian => parser.read_big_endian_element(reader, element_def),
        Encoding::BinaryLittleEndian => parser.read_little_endian_element(reader, element_def),
    }
}

/// 文件头中声明为列表的顶点属性
fn list_properties(elements: &[HeaderElement]) -> PropertySet {
    elements
        .iter()
        .filter(|e| e.name == VERTEX_ELEMENT)
        .flat_map(|e| e.properties.iter())
        .filter(|p| p.is_list)
        .filter_map(|p| VertexProperty::from_name(&p.name))
        .collect()
}

/// 标量属性的值；列表返回 `None`
fn scalar_value(property: &Property) -> Option<f64> {
    match property {
        Property::Char(v) => Some(f64::from(*v)),
        Property::UChar(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        _ => None,
    }
}

/// 把面的索引属性转换为有符号整数列表
///
/// 标量按单元素列表处理。
fn property_as_indices(property: &Property) -> Vec<i64> {
    fn ints<T: Copy + Into<i64>>(v: &[T]) -> Vec<i64> {
        v.iter().map(|&x| x.into()).collect()
    }

    match property {
        Property::ListChar(v) => ints(v),
        Property::ListUChar(v) => ints(v),
        Property::ListShort(v) => ints(v),
        Property::ListUShort(v) => ints(v),
        Property::ListInt(v) => ints(v),
        Property::ListUInt(v) => ints(v),
        Property::ListFloat(v) => v.iter().map(|&x| x as i64).collect(),
        Property::ListDouble(v) => v.iter().map(|&x| x as i64).collect(),
        scalar => scalar_value(scalar).map(|v| vec![v as i64]).unwrap_or_default(),
    }
}

/// 把一个顶点记录中登记过的属性逐值交给 `sink`
///
/// 声明为列表的属性不论实际长度都返回 `InvalidStructure`。
fn deliver_vertex(
    record: &DefaultElement,
    wanted: PropertySet,
    lists: PropertySet,
    sink: &mut dyn ElementSink,
) -> LoadResult<()> {
    for (name, value) in record.iter() {
        let Some(property) = VertexProperty::from_name(name) else {
            continue;
        };
        if !wanted.contains(property) {
            continue;
        }

        let scalar = scalar_value(value).filter(|_| !lists.contains(property));
        let Some(v) = scalar else {
            return Err(MeshLoadError::InvalidStructure(format!(
                "List type property not supported for vertex element '{}'",
                property
            )));
        };
        sink.on_vertex_scalar(property, ScalarArgument::scalar(v))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoadErrorKind;
    use crate::geometry::property::PropertyGroup;

    #[derive(Default)]
    struct Recorder {
        scalars: Vec<(VertexProperty, ScalarArgument)>,
        faces: Vec<Vec<i64>>,
    }

    impl ElementSink for Recorder {
        fn on_vertex_scalar(&mut self, property: VertexProperty, argument: ScalarArgument) -> LoadResult<()> {
            self.scalars.push((property, argument));
            Ok(())
        }

        fn on_face_indices(&mut self, indices: &[i64]) -> LoadResult<()> {
            self.faces.push(indices.to_vec());
            Ok(())
        }
    }

    const ASCII_QUAD: &str = "ply
format ascii 1.0
element vertex 4
property float z
property float x
property float y
property uchar red
element face 1
property list uchar int vertex_indices
end_header
0 0 0 10
0 1 0 20
0 1 1 30
0 0 1 40
4 0 1 2 3
";

    fn all_registered() -> Registration {
        Registration {
            vertex: VertexProperty::ALL.iter().copied().collect(),
            face_indices: true,
        }
    }

    #[test]
    fn test_header_elements() {
        let mut source = PlyRsSource::from_bytes(ASCII_QUAD.as_bytes());
        source.read_header().unwrap();

        let names: Vec<&str> = source.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["vertex", "face"]);
        assert_eq!(source.element("vertex").unwrap().count, 4);
        assert!(source.has_property("vertex", "red"));
        assert!(!source.has_property("vertex", "nx"));
        assert!(source.element("face").unwrap().property("vertex_indices").unwrap().is_list);
    }

    #[test]
    fn test_values_delivered_in_file_order() {
        let mut source = PlyRsSource::from_bytes(ASCII_QUAD.as_bytes());
        source.read_header().unwrap();

        let mut recorder = Recorder::default();
        source.read(&all_registered(), &mut recorder).unwrap();

        assert_eq!(recorder.scalars.len(), 16);
        assert_eq!(recorder.scalars[0].0, VertexProperty::Z);
        assert_eq!(recorder.scalars[1].0, VertexProperty::X);
        assert_eq!(recorder.scalars[3], (VertexProperty::Red, ScalarArgument::scalar(10.0)));
        assert_eq!(recorder.faces, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_only_registered_values_delivered() {
        let mut source = PlyRsSource::from_bytes(ASCII_QUAD.as_bytes());
        source.read_header().unwrap();

        let registration = Registration {
            vertex: PropertyGroup::Position.set(),
            face_indices: false,
        };
        let mut recorder = Recorder::default();
        source.read(&registration, &mut recorder).unwrap();

        assert_eq!(recorder.scalars.len(), 12);
        assert!(recorder.scalars.iter().all(|(p, _)| p.group() == PropertyGroup::Position));
        assert!(recorder.faces.is_empty());
    }

    #[test]
    fn test_list_vertex_property_rejected() {
        let doc = "ply
format ascii 1.0
element vertex 1
property float x
property float y
property list uchar float z
end_header
1 2 1 3
";
        let mut source = PlyRsSource::from_bytes(doc.as_bytes());
        source.read_header().unwrap();
        assert!(source.element("vertex").unwrap().property("z").unwrap().is_list);

        let mut recorder = Recorder::default();
        let err = source.read(&all_registered(), &mut recorder).unwrap_err();

        assert_eq!(err.kind(), LoadErrorKind::InvalidStructure);
        assert!(err.message().contains("'z'"));
        assert_eq!(recorder.scalars.len(), 2);
    }

    #[test]
    fn test_unregistered_list_property_skipped() {
        let doc = "ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property list uchar float s
end_header
1 2 3 2 0.5 0.5
";
        let mut source = PlyRsSource::from_bytes(doc.as_bytes());
        source.read_header().unwrap();

        let registration = Registration {
            vertex: PropertyGroup::Position.set(),
            face_indices: false,
        };
        let mut recorder = Recorder::default();
        source.read(&registration, &mut recorder).unwrap();
        assert_eq!(recorder.scalars.len(), 3);
    }

    #[test]
    fn test_binary_little_endian() {
        let mut data = b"ply
format binary_little_endian 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar uint vertex_indices
end_header
"
        .to_vec();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.push(3);
        for i in [0u32, 1, 2] {
            data.extend_from_slice(&i.to_le_bytes());
        }

        let mut source = PlyRsSource::from_bytes(&data);
        source.read_header().unwrap();
        let mut recorder = Recorder::default();
        source.read(&all_registered(), &mut recorder).unwrap();

        assert_eq!(recorder.scalars.len(), 9);
        assert_eq!(recorder.scalars[3].1.value, 1.0);
        assert_eq!(recorder.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_binary_big_endian_skips_other_elements() {
        let mut data = b"ply
format binary_big_endian 1.0
element vertex 3
property float x
property float y
property float z
element material 2
property list uchar float values
element face 1
property list uchar int vertex_indices
end_header
"
        .to_vec();
        for v in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        for count in [1u8, 2] {
            data.push(count);
            for _ in 0..count {
                data.extend_from_slice(&7.0f32.to_be_bytes());
            }
        }
        data.push(3);
        for i in [2i32, 1, 0] {
            data.extend_from_slice(&i.to_be_bytes());
        }

        let mut source = PlyRsSource::from_bytes(&data);
        source.read_header().unwrap();
        let mut recorder = Recorder::default();
        source.read(&all_registered(), &mut recorder).unwrap();

        assert_eq!(recorder.scalars.len(), 9);
        assert_eq!(recorder.scalars[3], (VertexProperty::X, ScalarArgument::scalar(2.0)));
        assert_eq!(recorder.faces, vec![vec![2, 1, 0]]);
    }

    #[test]
    fn test_bad_header() {
        let mut source = PlyRsSource::from_bytes(b"not a ply file\n");
        let err = source.read_header().unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Header);
    }

    #[test]
    fn test_open_missing_file() {
        let err = PlyRsSource::open(Path::new("nonexistent_model_12345.ply"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), LoadErrorKind::Io);
    }

    #[test]
    fn test_truncated_payload() {
        let doc = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
end_header
0 0 0
";
        let mut source = PlyRsSource::from_bytes(doc.as_bytes());
        source.read_header().unwrap();
        let err = source.read(&all_registered(), &mut Recorder::default()).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Parse);
    }
}
