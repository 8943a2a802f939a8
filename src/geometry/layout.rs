/// 顶点记录布局
///
/// 根据文件中实际存在的属性计算每个属性在顶点记录中的字节偏移和记录步长。
/// 偏移按属性表顺序依次累加，只计入存在的属性；步长向上对齐到 4 字节。

use super::property::{PropertyGroup, PropertySet, ScalarStorage, VertexProperty};

/// 顶点记录的步长对齐
pub const STRIDE_ALIGNMENT: u32 = 4;

/// 单条顶点记录的最大字节数（所有属性都存在时）
pub const MAX_RECORD_SIZE: usize = 36;

/// 暴露给渲染后端的一个顶点属性
///
/// 只有整组属性都存在的分组才会生成属性描述。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// 语义分组
    pub group: PropertyGroup,
    /// 分量数（位置/法线 3，纹理坐标 2，颜色 3）
    pub components: u32,
    /// 每个分量的存储类型
    pub storage: ScalarStorage,
    /// 记录内的字节偏移
    pub offset: u32,
}

/// 顶点记录布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    offsets: [Option<u32>; VertexProperty::COUNT],
    stride: u32,
    available: PropertySet,
}

impl VertexLayout {
    /// 按属性表顺序逐个尝试登记属性
    ///
    /// `register` 返回 `false` 表示该属性不在文件中，它会被跳过，
    /// 不占用偏移也不计入步长。
    pub fn register<F>(mut register: F) -> Self
    where
        F: FnMut(VertexProperty) -> bool,
    {
        let mut offsets = [None; VertexProperty::COUNT];
        let mut available = PropertySet::empty();
        let mut size = 0u32;

        for property in VertexProperty::ALL {
            if register(property) {
                offsets[property.index()] = Some(size);
                size += property.byte_size();
                available.insert(property);
            }
        }

        let stride = (size + STRIDE_ALIGNMENT - 1) & !(STRIDE_ALIGNMENT - 1);

        Self {
            offsets,
            stride,
            available,
        }
    }

    /// 由给定属性集合构建布局
    pub fn from_properties(properties: PropertySet) -> Self {
        Self::register(|p| properties.contains(p))
    }

    /// 属性在记录中的字节偏移；不存在的属性返回 `None`
    #[inline]
    pub fn offset(&self, property: VertexProperty) -> Option<u32> {
        self.offsets[property.index()]
    }

    /// 记录步长（字节），总是 4 的倍数
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// 文件中可用的属性
    #[inline]
    pub fn available(&self) -> PropertySet {
        self.available
    }

    /// 完整分组的属性描述，按分组顺序排列
    pub fn attributes(&self) -> Vec<VertexAttribute> {
        PropertyGroup::ALL
            .iter()
            .filter(|group| self.available.has_group(**group))
            .filter_map(|group| {
                let members = group.members();
                let first = members[0];
                Some(VertexAttribute {
                    group: *group,
                    components: members.len() as u32,
                    storage: first.storage(),
                    offset: self.offset(first)?,
                })
            })
            .collect()
    }

    /// 查找某个完整分组的属性描述
    pub fn attribute(&self, group: PropertyGroup) -> Option<VertexAttribute> {
        self.attributes().into_iter().find(|a| a.group == group)
    }
}
