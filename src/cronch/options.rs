/// 默认的压缩质量
const DEF_QUALITY: u8 = 90;

/// 固定的几何变换参数。
///
/// 生产流程里这些值不会变，作为结构体传入是为了测试时可以单独调整。
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// 逆时针旋转角度（度）
    pub angle: f32,
    /// 目标宽度
    pub width: u32,
    /// 目标高度
    pub height: u32,
    /// 水平平移，负值向左
    pub offset_x: f32,
    /// 垂直平移，负值向上
    pub offset_y: f32,
}

impl Default for TransformOptions {
    fn default() -> TransformOptions {
        TransformOptions {
            angle: 25.0,
            width: 128,
            height: 128,
            offset_x: -12.0,
            offset_y: -26.0,
        }
    }
}

/// 颜色平面与透明通道各自独立的压缩质量，`0-100`
#[derive(Debug, Clone, Copy)]
pub struct Quality {
    /// 颜色平面的质量
    pub chroma: u8,
    /// 透明通道的质量
    pub alpha: u8,
}

impl Quality {
    /// 默认质量 90/90，超出范围的值收缩到 100
    pub fn new(chroma: Option<u8>, alpha: Option<u8>) -> Quality {
        Quality {
            chroma: chroma.unwrap_or(DEF_QUALITY).min(100),
            alpha: alpha.unwrap_or(DEF_QUALITY).min(100),
        }
    }
}
