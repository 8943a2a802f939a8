/// 顶点属性表
///
/// 定义可识别的顶点标量属性、它们的存储大小和语义分组。
/// 表的顺序固定，并按存储大小降序排列（4 字节浮点在前，1 字节颜色在后），
/// 因此依次累加得到的每个写入偏移都是自然对齐的。

use std::fmt;

/// 单个属性的存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStorage {
    /// 4 字节浮点
    Float32,
    /// 1 字节无符号整数（颜色通道）
    Unorm8,
}

impl ScalarStorage {
    /// 字节大小
    #[inline]
    pub fn byte_size(self) -> u32 {
        match self {
            ScalarStorage::Float32 => 4,
            ScalarStorage::Unorm8 => 1,
        }
    }
}

/// 可识别的顶点属性
///
/// 判别值即属性在表中的序号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum VertexProperty {
    X = 0,
    Y,
    Z,
    Nx,
    Ny,
    Nz,
    S,
    T,
    Red,
    Green,
    Blue,
}

impl VertexProperty {
    /// 属性数量
    pub const COUNT: usize = 11;

    /// 按表顺序排列的全部属性
    pub const ALL: [VertexProperty; Self::COUNT] = [
        VertexProperty::X,
        VertexProperty::Y,
        VertexProperty::Z,
        VertexProperty::Nx,
        VertexProperty::Ny,
        VertexProperty::Nz,
        VertexProperty::S,
        VertexProperty::T,
        VertexProperty::Red,
        VertexProperty::Green,
        VertexProperty::Blue,
    ];

    /// 表中的序号
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// 文件头中使用的属性名
    pub fn name(self) -> &'static str {
        match self {
            VertexProperty::X => "x",
            VertexProperty::Y => "y",
            VertexProperty::Z => "z",
            VertexProperty::Nx => "nx",
            VertexProperty::Ny => "ny",
            VertexProperty::Nz => "nz",
            VertexProperty::S => "s",
            VertexProperty::T => "t",
            VertexProperty::Red => "red",
            VertexProperty::Green => "green",
            VertexProperty::Blue => "blue",
        }
    }

    /// 按属性名查找
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// 所属分组
    pub fn group(self) -> PropertyGroup {
        match self {
            VertexProperty::X | VertexProperty::Y | VertexProperty::Z => PropertyGroup::Position,
            VertexProperty::Nx | VertexProperty::Ny | VertexProperty::Nz => PropertyGroup::Normal,
            VertexProperty::S | VertexProperty::T => PropertyGroup::TexCoord,
            VertexProperty::Red | VertexProperty::Green | VertexProperty::Blue => PropertyGroup::Color,
        }
    }

    /// 存储类型：颜色通道为 1 字节，其余为 4 字节浮点
    #[inline]
    pub fn storage(self) -> ScalarStorage {
        match self.group() {
            PropertyGroup::Color => ScalarStorage::Unorm8,
            _ => ScalarStorage::Float32,
        }
    }

    /// 存储字节数
    #[inline]
    pub fn byte_size(self) -> u32 {
        self.storage().byte_size()
    }
}

impl fmt::Display for VertexProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 属性语义分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyGroup {
    Position,
    Normal,
    TexCoord,
    Color,
}

impl PropertyGroup {
    pub const ALL: [PropertyGroup; 4] = [
        PropertyGroup::Position,
        PropertyGroup::Normal,
        PropertyGroup::TexCoord,
        PropertyGroup::Color,
    ];

    /// 组内成员（按表顺序）
    pub fn members(self) -> &'static [VertexProperty] {
        match self {
            PropertyGroup::Position => &VertexProperty::ALL[0..3],
            PropertyGroup::Normal => &VertexProperty::ALL[3..6],
            PropertyGroup::TexCoord => &VertexProperty::ALL[6..8],
            PropertyGroup::Color => &VertexProperty::ALL[8..11],
        }
    }

    /// 组内成员构成的集合
    pub fn set(self) -> PropertySet {
        self.members().iter().copied().collect()
    }
}

/// 顶点属性集合
///
/// 用于表示"文件中可用的属性"以及"当前顶点已收到的属性"。
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PropertySet {
    bits: u16,
}

impl PropertySet {
    /// 空集合
    #[inline]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    #[inline]
    pub fn insert(&mut self, property: VertexProperty) {
        self.bits |= 1 << property.index();
    }

    #[inline]
    pub fn contains(&self, property: VertexProperty) -> bool {
        self.bits & (1 << property.index()) != 0
    }

    /// `other` 中的每个属性都在本集合中
    #[inline]
    pub fn is_superset(&self, other: &PropertySet) -> bool {
        self.bits & other.bits == other.bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bits = 0;
    }

    /// 按表顺序遍历集合中的属性
    pub fn iter(&self) -> impl Iterator<Item = VertexProperty> + '_ {
        VertexProperty::ALL.iter().copied().filter(move |p| self.contains(*p))
    }

    /// 整组属性是否都存在
    pub fn has_group(&self, group: PropertyGroup) -> bool {
        self.is_superset(&group.set())
    }

    /// 组内是否只有部分属性存在
    pub fn has_partial_group(&self, group: PropertyGroup) -> bool {
        group.members().iter().any(|p| self.contains(*p)) && !self.has_group(group)
    }

    pub fn has_position(&self) -> bool {
        self.has_group(PropertyGroup::Position)
    }

    pub fn has_normal(&self) -> bool {
        self.has_group(PropertyGroup::Normal)
    }

    pub fn has_tex_coord(&self) -> bool {
        self.has_group(PropertyGroup::TexCoord)
    }

    pub fn has_color(&self) -> bool {
        self.has_group(PropertyGroup::Color)
    }
}

impl FromIterator<VertexProperty> for PropertySet {
    fn from_iter<I: IntoIterator<Item = VertexProperty>>(iter: I) -> Self {
        let mut set = PropertySet::empty();
        for property in iter {
            set.insert(property);
        }
        set
    }
}

impl fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(VertexProperty::name)).finish()
    }
}
